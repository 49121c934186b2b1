use std::sync::Arc;

use async_std::channel::Sender;
use core_types::{CollectionRef, FileHandle, FolderRef, events::UploadEvent};
use remote_session::RemoteSession;
use uuid::Uuid;

use crate::{
    error::{Error, require_non_empty},
    path::{NormalizedPath, normalize_relative_path},
    progress::{ProgressTracker, notify, percent_of},
    remote_call::call,
    settings::{Settings, mb_to_bytes},
    upload::session::UploadSession,
};

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    /// Chunk size in bytes. Content strictly larger than this is uploaded in chunks.
    pub chunk_size: usize,
    /// Upload id to bind the chunks to. Reusing the same id keeps a retried upload
    /// attached to the chunks the server already has. A fresh id is generated when unset.
    pub session_token: Option<Uuid>,
}

impl UploadOptions {
    pub fn with_chunk_size_mb(chunk_size_mb: usize) -> Result<Self, Error> {
        mb_to_bytes(chunk_size_mb)
            .map(Self::with_chunk_size)
            .ok_or_else(|| {
                Error::PreconditionViolation(format!(
                    "chunk size of {} MB does not fit into memory",
                    chunk_size_mb
                ))
            })
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            session_token: None,
        }
    }

    pub fn session_token(mut self, token: Uuid) -> Self {
        self.session_token = Some(token);
        self
    }
}

impl From<&Settings> for UploadOptions {
    fn from(settings: &Settings) -> Self {
        Self::with_chunk_size(settings.upload_chunk_size_bytes())
    }
}

/// Uploads binary content into a collection, switching to the start/continue/finish
/// protocol when the content does not fit into one chunk.
pub struct UploadService {
    session: Arc<dyn RemoteSession>,
    settings: Arc<Settings>,
}

impl UploadService {
    pub fn new(session: Arc<dyn RemoteSession>, settings: Arc<Settings>) -> Self {
        Self { session, settings }
    }

    /// Upload with the configured chunk size and a fresh upload id.
    pub async fn upload_file(
        &self,
        collection: &CollectionRef,
        relative_path: &str,
        content: &[u8],
        progress_tx: Option<&Sender<UploadEvent>>,
    ) -> Result<FileHandle, Error> {
        let options = UploadOptions::from(self.settings.as_ref());
        self.upload_file_with(collection, relative_path, content, &options, progress_tx)
            .await
    }

    /// Upload `content` to `relative_path` under the collection root.
    ///
    /// Any failed remote call aborts the upload. Nothing is cleaned up: a started
    /// chunked upload stays on the server until it is finished with the same upload id
    /// or abandoned by the caller.
    #[tracing::instrument(
        skip_all,
        fields(collection = %collection, path = relative_path, bytes = content.len(), chunk_size = options.chunk_size),
        err
    )]
    pub async fn upload_file_with(
        &self,
        collection: &CollectionRef,
        relative_path: &str,
        content: &[u8],
        options: &UploadOptions,
        progress_tx: Option<&Sender<UploadEvent>>,
    ) -> Result<FileHandle, Error> {
        require_non_empty(&collection.title, "collection title")?;
        if options.chunk_size == 0 {
            return Err(Error::PreconditionViolation(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        let path = normalize_relative_path(relative_path)?;
        let display_path = path.full_path();
        let chunked = content.len() > options.chunk_size;

        tracing::info!(path = %display_path, chunked, "Starting upload");
        notify(
            progress_tx,
            UploadEvent::Started {
                path: display_path.clone(),
                total_bytes: content.len() as u64,
                chunked,
            },
        )
        .await;

        let result = match self.resolve_folder(collection, &path).await {
            Ok(folder) if chunked => {
                self.upload_in_chunks(&folder, &path, content, options, progress_tx)
                    .await
            }
            Ok(folder) => {
                self.upload_in_one_call(&folder, &path, content, progress_tx)
                    .await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(file) => {
                tracing::info!(url = %file.server_relative_url, length = file.length, "Upload completed");
                notify(
                    progress_tx,
                    UploadEvent::Completed {
                        path: display_path,
                    },
                )
                .await;
            }
            Err(e) => {
                tracing::error!(path = %display_path, "Upload failed: {}", e);
                notify(
                    progress_tx,
                    UploadEvent::Failed {
                        path: display_path,
                        error: e.to_string(),
                    },
                )
                .await;
            }
        }
        result
    }

    async fn resolve_folder(
        &self,
        collection: &CollectionRef,
        path: &NormalizedPath,
    ) -> Result<FolderRef, Error> {
        let timeout = self.settings.remote_call_timeout;
        let root = call(timeout, "root_folder", self.session.root_folder(collection)).await?;
        if path.is_root_folder() {
            return Ok(root);
        }
        let folder_url = format!(
            "{}{}",
            root.server_relative_url.trim_end_matches('/'),
            path.folder
        );
        Ok(call(timeout, "get_folder", self.session.get_folder(&folder_url)).await?)
    }

    async fn upload_in_one_call(
        &self,
        folder: &FolderRef,
        path: &NormalizedPath,
        content: &[u8],
        progress_tx: Option<&Sender<UploadEvent>>,
    ) -> Result<FileHandle, Error> {
        let display_path = path.full_path();
        let mut tracker = ProgressTracker::new();
        notify(
            progress_tx,
            UploadEvent::Progress {
                path: display_path.clone(),
                percent: tracker.advance(0),
            },
        )
        .await;

        let file = call(
            self.settings.remote_call_timeout,
            "create_file",
            self.session.create_file(folder, &path.file_name, content),
        )
        .await?;

        notify(
            progress_tx,
            UploadEvent::Progress {
                path: display_path,
                percent: tracker.finish(),
            },
        )
        .await;
        Ok(file)
    }

    async fn upload_in_chunks(
        &self,
        folder: &FolderRef,
        path: &NormalizedPath,
        content: &[u8],
        options: &UploadOptions,
        progress_tx: Option<&Sender<UploadEvent>>,
    ) -> Result<FileHandle, Error> {
        let timeout = self.settings.remote_call_timeout;
        let display_path = path.full_path();
        let mut upload = UploadSession::new(
            options.session_token.unwrap_or_else(Uuid::new_v4),
            folder.clone(),
            path.file_name.clone(),
            content.len() as u64,
            options.chunk_size,
        );
        let total = upload.total_length();
        let chunk_count = upload.chunk_count();

        let chunks: Vec<&[u8]> = content.chunks(options.chunk_size).collect();
        let Some((first, rest)) = chunks.split_first() else {
            return Err(Error::PreconditionViolation(
                "chunked upload needs content".to_string(),
            ));
        };
        let Some((last, middle)) = rest.split_last() else {
            return Err(Error::PreconditionViolation(
                "chunked upload needs at least two chunks".to_string(),
            ));
        };
        tracing::debug!(
            upload_id = %upload.upload_id(),
            chunk_count,
            "Uploading in chunks"
        );

        let mut tracker = ProgressTracker::new();
        let mut bytes_read: u64 = 0;
        notify(
            progress_tx,
            UploadEvent::Progress {
                path: display_path.clone(),
                percent: tracker.advance(0),
            },
        )
        .await;

        // start: empty file bound to the upload id, then the first chunk
        bytes_read += first.len() as u64;
        self.report_read(&display_path, &mut tracker, bytes_read, total, progress_tx)
            .await;
        let file = call(
            timeout,
            "create_file",
            self.session.create_file(folder, &path.file_name, &[]),
        )
        .await?;
        let accepted = call(
            timeout,
            "start_upload",
            self.session.start_upload(&file, upload.upload_id(), first),
        )
        .await?;
        upload.acknowledge(accepted)?;
        self.report_chunk(&display_path, 1, upload.offset(), progress_tx)
            .await;

        // continue: the handle is looked up again for every call
        for (index, chunk) in middle.iter().enumerate() {
            bytes_read += chunk.len() as u64;
            self.report_read(&display_path, &mut tracker, bytes_read, total, progress_tx)
                .await;
            let file = call(timeout, "get_file", self.session.get_file(&upload.target_url())).await?;
            let accepted = call(
                timeout,
                "continue_upload",
                self.session
                    .continue_upload(&file, upload.upload_id(), upload.offset(), chunk),
            )
            .await?;
            upload.acknowledge(accepted)?;
            self.report_chunk(&display_path, index as u32 + 2, upload.offset(), progress_tx)
                .await;
        }

        // finish: the server returns the persisted file
        bytes_read += last.len() as u64;
        self.report_read(&display_path, &mut tracker, bytes_read, total, progress_tx)
            .await;
        let file = call(timeout, "get_file", self.session.get_file(&upload.target_url())).await?;
        let finished = call(
            timeout,
            "finish_upload",
            self.session
                .finish_upload(&file, upload.upload_id(), upload.offset(), last),
        )
        .await?;
        self.report_chunk(
            &display_path,
            chunk_count as u32,
            upload.offset() + last.len() as u64,
            progress_tx,
        )
        .await;

        notify(
            progress_tx,
            UploadEvent::Progress {
                path: display_path,
                percent: tracker.finish(),
            },
        )
        .await;
        Ok(finished)
    }

    async fn report_read(
        &self,
        path: &str,
        tracker: &mut ProgressTracker,
        bytes_read: u64,
        total: u64,
        progress_tx: Option<&Sender<UploadEvent>>,
    ) {
        let percent = tracker.advance(percent_of(bytes_read, total));
        notify(
            progress_tx,
            UploadEvent::Progress {
                path: path.to_string(),
                percent,
            },
        )
        .await;
    }

    async fn report_chunk(
        &self,
        path: &str,
        chunk: u32,
        offset: u64,
        progress_tx: Option<&Sender<UploadEvent>>,
    ) {
        tracing::debug!(chunk, offset, "Chunk acknowledged");
        notify(
            progress_tx,
            UploadEvent::ChunkAcknowledged {
                path: path.to_string(),
                chunk,
                offset,
            },
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ListTemplate;
    use remote_session::{MockRemoteSession, RecordedCall, RemoteError};

    const DOCS_ROOT: &str = "/sites/mock/Docs";

    fn setup() -> (MockRemoteSession, UploadService, CollectionRef) {
        let mock = MockRemoteSession::new();
        let docs = mock.add_collection("Docs", ListTemplate::DocumentLibrary);
        let service = UploadService::new(Arc::new(mock.clone()), Arc::new(Settings::default()));
        (mock, service, docs)
    }

    fn content(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn chunk_calls(calls: &[RecordedCall]) -> Vec<RecordedCall> {
        calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    RecordedCall::StartUpload { .. }
                        | RecordedCall::ContinueUpload { .. }
                        | RecordedCall::FinishUpload { .. }
                )
            })
            .cloned()
            .collect()
    }

    fn create_calls(calls: &[RecordedCall]) -> usize {
        calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::CreateFile { .. }))
            .count()
    }

    fn percents(rx: &async_std::channel::Receiver<UploadEvent>) -> Vec<u8> {
        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Some(percent) = event.percent() {
                percents.push(percent);
            }
        }
        percents
    }

    #[async_std::test]
    async fn test_small_content_uses_single_create() {
        let (mock, service, docs) = setup();
        let (tx, rx) = async_std::channel::unbounded();

        let file = service
            .upload_file_with(
                &docs,
                "notes.txt",
                b"hello",
                &UploadOptions::with_chunk_size(8),
                Some(&tx),
            )
            .await
            .unwrap();

        assert_eq!(file.server_relative_url, "/sites/mock/Docs/notes.txt");
        assert_eq!(file.length, 5);
        let calls = mock.calls();
        assert_eq!(create_calls(&calls), 1);
        assert!(chunk_calls(&calls).is_empty());
        assert_eq!(percents(&rx), vec![0, 100]);
    }

    #[async_std::test]
    async fn test_boundary_sizes_take_single_call() {
        for len in [0usize, 8] {
            let (mock, service, docs) = setup();
            service
                .upload_file_with(
                    &docs,
                    "f.bin",
                    &content(len),
                    &UploadOptions::with_chunk_size(8),
                    None,
                )
                .await
                .unwrap();
            let calls = mock.calls();
            assert_eq!(create_calls(&calls), 1, "length {}", len);
            assert!(chunk_calls(&calls).is_empty(), "length {}", len);
        }
    }

    #[async_std::test]
    async fn test_chunk_call_count_is_ceil_of_length() {
        for (len, expected) in [(9usize, 2usize), (16, 2), (17, 3), (40, 5)] {
            let (mock, service, docs) = setup();
            let (tx, rx) = async_std::channel::unbounded();
            let data = content(len);
            service
                .upload_file_with(
                    &docs,
                    "f.bin",
                    &data,
                    &UploadOptions::with_chunk_size(8),
                    Some(&tx),
                )
                .await
                .unwrap();

            let mut last_chunk = 0;
            while let Ok(event) = rx.try_recv() {
                if let UploadEvent::ChunkAcknowledged { chunk, .. } = event {
                    last_chunk = chunk;
                }
            }
            assert_eq!(last_chunk as usize, expected, "length {}", len);

            let chunks = chunk_calls(&mock.calls());
            assert_eq!(chunks.len(), expected, "length {}", len);
            assert!(matches!(chunks[0], RecordedCall::StartUpload { .. }));
            assert!(matches!(
                chunks[expected - 1],
                RecordedCall::FinishUpload { .. }
            ));
            assert_eq!(mock.file_content("/sites/mock/Docs/f.bin").unwrap(), data);
        }
    }

    #[async_std::test]
    async fn test_offsets_follow_server_acknowledgements() {
        let (mock, service, docs) = setup();
        mock.set_upload_ack_shortfall(2);

        service
            .upload_file_with(
                &docs,
                "f.bin",
                &content(30),
                &UploadOptions::with_chunk_size(8),
                None,
            )
            .await
            .unwrap();

        let offsets: Vec<u64> = chunk_calls(&mock.calls())
            .iter()
            .filter_map(|c| match c {
                RecordedCall::ContinueUpload { offset, .. }
                | RecordedCall::FinishUpload { offset, .. } => Some(*offset),
                _ => None,
            })
            .collect();
        // 8 byte chunks, server keeps 6 of each
        assert_eq!(offsets, vec![6, 12, 18]);
    }

    #[async_std::test]
    async fn test_same_upload_id_for_all_chunks() {
        let (mock, service, docs) = setup();
        let token = Uuid::new_v4();

        service
            .upload_file_with(
                &docs,
                "f.bin",
                &content(20),
                &UploadOptions::with_chunk_size(8).session_token(token),
                None,
            )
            .await
            .unwrap();

        for call in chunk_calls(&mock.calls()) {
            let upload_id = match call {
                RecordedCall::StartUpload { upload_id, .. }
                | RecordedCall::ContinueUpload { upload_id, .. }
                | RecordedCall::FinishUpload { upload_id, .. } => upload_id,
                _ => unreachable!(),
            };
            assert_eq!(upload_id, token);
        }
    }

    #[async_std::test]
    async fn test_progress_is_monotonic_and_ends_at_hundred() {
        let (_mock, service, docs) = setup();
        let (tx, rx) = async_std::channel::unbounded();

        service
            .upload_file_with(
                &docs,
                "f.bin",
                &content(7),
                &UploadOptions::with_chunk_size(3),
                Some(&tx),
            )
            .await
            .unwrap();

        let reported = percents(&rx);
        assert_eq!(reported, vec![0, 42, 85, 100, 100]);
        assert!(reported.windows(2).all(|w| w[0] <= w[1]));
    }

    #[async_std::test]
    async fn test_upload_into_subfolder() {
        let (mock, service, docs) = setup();
        mock.add_folder(format!("{}/2024/q1", DOCS_ROOT));

        let file = service
            .upload_file(&docs, "2024\\q1\\report.pdf", b"pdf", None)
            .await
            .unwrap();

        assert_eq!(file.server_relative_url, "/sites/mock/Docs/2024/q1/report.pdf");
    }

    #[async_std::test]
    async fn test_missing_folder_is_remote_failure() {
        let (_mock, service, docs) = setup();

        let result = service
            .upload_file(&docs, "missing/report.pdf", b"pdf", None)
            .await;

        assert!(matches!(
            result,
            Err(Error::RemoteCallFailed(RemoteError::NotFound(_)))
        ));
    }

    #[async_std::test]
    async fn test_failed_chunk_aborts_without_cleanup() {
        let (mock, service, docs) = setup();
        mock.fail_on("continue_upload", "Connection reset");
        let (tx, rx) = async_std::channel::unbounded();

        let result = service
            .upload_file_with(
                &docs,
                "f.bin",
                &content(30),
                &UploadOptions::with_chunk_size(8),
                Some(&tx),
            )
            .await;

        assert_eq!(
            result,
            Err(Error::RemoteCallFailed(RemoteError::Server(
                "Connection reset".to_string()
            )))
        );
        assert_eq!(mock.open_upload_count(), 1);
        let calls = chunk_calls(&mock.calls());
        assert_eq!(calls.len(), 2);

        let mut failed = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, UploadEvent::Failed { .. }) {
                failed = true;
            }
        }
        assert!(failed);
    }

    #[async_std::test]
    async fn test_invalid_input_makes_no_remote_calls() {
        let (mock, service, docs) = setup();

        let bad_path = service.upload_file(&docs, "../x.txt", b"x", None).await;
        let bad_chunk = service
            .upload_file_with(&docs, "x.txt", b"x", &UploadOptions::with_chunk_size(0), None)
            .await;

        assert!(matches!(bad_path, Err(Error::PreconditionViolation(_))));
        assert!(matches!(bad_chunk, Err(Error::PreconditionViolation(_))));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_options_from_settings() {
        let options = UploadOptions::from(&Settings::default());
        assert_eq!(options.chunk_size, 3 * 1024 * 1024);
        assert_eq!(options.session_token, None);
        assert_eq!(
            UploadOptions::with_chunk_size_mb(1).unwrap().chunk_size,
            1024 * 1024
        );
    }

    #[test]
    fn test_oversized_chunk_size_mb_rejected() {
        assert!(matches!(
            UploadOptions::with_chunk_size_mb(usize::MAX),
            Err(Error::PreconditionViolation(_))
        ));
    }
}
