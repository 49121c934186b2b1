use core_types::{ByteCount, FolderRef};
use remote_session::RemoteError;
use uuid::Uuid;

/// Client side state of one chunked upload.
///
/// `offset` only ever holds a value the server acknowledged. It starts at zero and
/// never moves backwards.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadSession {
    upload_id: Uuid,
    folder: FolderRef,
    file_name: String,
    total_length: ByteCount,
    chunk_size: usize,
    offset: ByteCount,
}

impl UploadSession {
    pub fn new(
        upload_id: Uuid,
        folder: FolderRef,
        file_name: impl Into<String>,
        total_length: ByteCount,
        chunk_size: usize,
    ) -> Self {
        Self {
            upload_id,
            folder,
            file_name: file_name.into(),
            total_length,
            chunk_size,
            offset: 0,
        }
    }

    pub fn upload_id(&self) -> Uuid {
        self.upload_id
    }

    pub fn offset(&self) -> ByteCount {
        self.offset
    }

    pub fn total_length(&self) -> ByteCount {
        self.total_length
    }

    pub fn chunk_count(&self) -> usize {
        (self.total_length as usize).div_ceil(self.chunk_size.max(1))
    }

    /// Server relative url of the file being uploaded.
    pub fn target_url(&self) -> String {
        self.folder.child_url(&self.file_name)
    }

    /// Take over the offset the server reported after a chunk.
    pub fn acknowledge(&mut self, acknowledged: ByteCount) -> Result<ByteCount, RemoteError> {
        if acknowledged < self.offset {
            return Err(RemoteError::Protocol(format!(
                "upload {} acknowledged offset {} after {}",
                self.upload_id, acknowledged, self.offset
            )));
        }
        self.offset = acknowledged;
        Ok(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(total_length: u64, chunk_size: usize) -> UploadSession {
        UploadSession::new(
            Uuid::new_v4(),
            FolderRef::new("/sites/dev/Docs"),
            "big.bin",
            total_length,
            chunk_size,
        )
    }

    #[test]
    fn test_chunk_count() {
        assert_eq!(session(10, 4).chunk_count(), 3);
        assert_eq!(session(8, 4).chunk_count(), 2);
    }

    #[test]
    fn test_target_url() {
        assert_eq!(session(1, 1).target_url(), "/sites/dev/Docs/big.bin");
    }

    #[test]
    fn test_offset_follows_server_and_never_decreases() {
        let mut upload = session(10, 4);
        assert_eq!(upload.acknowledge(3).unwrap(), 3);
        assert_eq!(upload.acknowledge(3).unwrap(), 3);
        assert!(matches!(upload.acknowledge(2), Err(RemoteError::Protocol(_))));
        assert_eq!(upload.offset(), 3);
    }
}
