#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    Started {
        path: String,
        total_bytes: u64,
        chunked: bool,
    },
    Progress {
        path: String,
        percent: u8,
    },
    ChunkAcknowledged {
        path: String,
        chunk: u32,
        offset: u64,
    },
    Completed {
        path: String,
    },
    Failed {
        path: String,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BulkEvent {
    Started {
        collection: String,
        total_entries: u64,
    },
    PageFetched {
        collection: String,
        page: u32,
        entries: usize,
    },
    EntriesDeleted {
        collection: String,
        deleted: u64,
    },
    Progress {
        collection: String,
        percent: u8,
    },
    Completed {
        collection: String,
    },
    Failed {
        collection: String,
        error: String,
    },
}

impl UploadEvent {
    pub fn percent(&self) -> Option<u8> {
        match self {
            UploadEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        }
    }
}

impl BulkEvent {
    pub fn percent(&self) -> Option<u8> {
        match self {
            BulkEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        }
    }
}
