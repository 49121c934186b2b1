use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use core_types::{
    ByteCount, CollectionRef, Entry, FieldValue, FileHandle, FolderRef, ItemId, ListTemplate,
    RoleType,
};
use uuid::Uuid;

use crate::{
    RemoteError,
    ops::{ProvisioningOps, RemoteSession},
    provisioning::{GroupInfo, ListCreation, ListInfo, ListUpdate, RoleAssignment, RoleScope},
    query::{ItemPage, ItemQuery, PageCursor, ViewDefinition},
};

const SITE_URL: &str = "/sites/mock";
const CURSOR_PREFIX: &str = "Paged=TRUE&p_ID=";
const DEFAULT_VIEW_THRESHOLD: u64 = 5000;
const THRESHOLD_MESSAGE: &str =
    "The attempted operation is prohibited because it exceeds the list view threshold.";

/// A remote call as seen by the mock, in the order it was issued.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Execute {
        flushed: usize,
    },
    QueueDelete {
        collection: String,
        item_id: ItemId,
    },
    ItemCount {
        collection: String,
    },
    GetItems {
        collection: String,
        row_limit: Option<u32>,
        cursor: Option<String>,
    },
    RootFolder {
        collection: String,
    },
    GetFolder {
        url: String,
    },
    GetFile {
        url: String,
    },
    CreateFile {
        url: String,
        length: usize,
    },
    StartUpload {
        url: String,
        upload_id: Uuid,
        length: usize,
    },
    ContinueUpload {
        url: String,
        upload_id: Uuid,
        offset: ByteCount,
        length: usize,
    },
    FinishUpload {
        url: String,
        upload_id: Uuid,
        offset: ByteCount,
        length: usize,
    },
    Provisioning {
        operation: &'static str,
    },
}

struct MockCollection {
    info: ListInfo,
    root_folder_url: String,
    entries: BTreeMap<ItemId, Entry>,
    next_item_id: ItemId,
    field_defaults: HashMap<String, String>,
    inherits_roles: bool,
}

struct MockUpload {
    url: String,
    received: Vec<u8>,
}

/// Internal state for MockRemoteSession.
///
/// Groups all mutable state into a single struct for simplified locking.
struct MockState {
    /// Collections by title
    collections: BTreeMap<String, MockCollection>,
    /// Server relative urls of existing folders (collection roots included)
    folders: HashSet<String>,
    /// Server relative url -> file content
    files: HashMap<String, Vec<u8>>,
    /// In-flight chunked uploads by upload id
    uploads: HashMap<Uuid, MockUpload>,
    /// Deletions waiting for the next execute
    pending_deletes: Vec<(String, ItemId)>,
    calls: Vec<RecordedCall>,
    /// Operation name -> server error message to fail with
    failures: HashMap<String, String>,
    /// Bytes of every upload chunk the server "drops" before acknowledging
    upload_ack_shortfall: u64,
    view_threshold: Option<u64>,
    groups: Vec<GroupInfo>,
    next_principal_id: i64,
    role_assignments: HashMap<RoleScope, Vec<RoleAssignment>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            collections: BTreeMap::new(),
            folders: HashSet::new(),
            files: HashMap::new(),
            uploads: HashMap::new(),
            pending_deletes: Vec::new(),
            calls: Vec::new(),
            failures: HashMap::new(),
            upload_ack_shortfall: 0,
            view_threshold: Some(DEFAULT_VIEW_THRESHOLD),
            groups: Vec::new(),
            next_principal_id: 1,
            role_assignments: HashMap::new(),
        }
    }
}

impl MockState {
    fn check_failure(&self, operation: &str) -> Result<(), RemoteError> {
        match self.failures.get(operation) {
            Some(message) => Err(RemoteError::Server(message.clone())),
            None => Ok(()),
        }
    }

    fn collection(&self, title: &str) -> Result<&MockCollection, RemoteError> {
        self.collections
            .get(title)
            .ok_or_else(|| RemoteError::NotFound(format!("List '{}' does not exist", title)))
    }

    fn collection_mut(&mut self, title: &str) -> Result<&mut MockCollection, RemoteError> {
        self.collections
            .get_mut(title)
            .ok_or_else(|| RemoteError::NotFound(format!("List '{}' does not exist", title)))
    }

    fn insert_collection(&mut self, info: ListInfo) {
        let root_folder_url = format!("{}/{}", SITE_URL, info.url);
        self.folders.insert(root_folder_url.clone());
        self.collections.insert(
            info.collection.title.clone(),
            MockCollection {
                info,
                root_folder_url,
                entries: BTreeMap::new(),
                next_item_id: 1,
                field_defaults: HashMap::new(),
                inherits_roles: true,
            },
        );
    }

    /// Files live in a library, so each stored file also shows up as an entry there.
    fn record_file_entry(&mut self, url: &str) {
        let owner = self
            .collections
            .values_mut()
            .find(|c| url.starts_with(&format!("{}/", c.root_folder_url)));
        if let Some(collection) = owner {
            let exists = collection
                .entries
                .values()
                .any(|e| matches!(e.get("FileRef"), Some(FieldValue::Text(u)) if u == url));
            if !exists {
                let id = collection.next_item_id;
                collection.next_item_id += 1;
                let name = url.rsplit('/').next().unwrap_or(url).to_string();
                collection.entries.insert(
                    id,
                    Entry::new(id)
                        .with_field("FileRef", FieldValue::Text(url.to_string()))
                        .with_field("FileLeafRef", FieldValue::Text(name)),
                );
            }
        }
    }
}

fn file_handle(url: &str, length: usize) -> FileHandle {
    FileHandle {
        server_relative_url: url.to_string(),
        name: url.rsplit('/').next().unwrap_or(url).to_string(),
        length: length as ByteCount,
    }
}

fn parse_cursor(cursor: &PageCursor) -> Result<ItemId, RemoteError> {
    cursor
        .as_str()
        .strip_prefix(CURSOR_PREFIX)
        .and_then(|id| id.parse::<ItemId>().ok())
        .ok_or_else(|| RemoteError::Protocol(format!("Invalid paging token: {}", cursor.as_str())))
}

fn matches_filter(entry: &Entry, view: &ViewDefinition) -> bool {
    match &view.filter {
        None => true,
        Some(filter) => match entry.get(&filter.field) {
            Some(FieldValue::Text(value)) => value == &filter.value,
            Some(other) => other.to_string() == filter.value,
            None => false,
        },
    }
}

fn project(entry: &Entry, view: &ViewDefinition) -> Entry {
    if view.fields.is_empty() {
        return entry.clone();
    }
    let mut projected = Entry::new(entry.id);
    for field in &view.fields {
        if let Some(value) = entry.get(field) {
            projected.fields.insert(field.clone(), value.clone());
        }
    }
    projected
}

/// Mock implementation of the remote session traits for testing
///
/// This mock allows you to:
/// - Seed collections, entries, folders and groups
/// - Page through entries with opaque cursors that survive deletions
/// - Buffer deletions until `execute`, like a real session
/// - Inject failures per operation and short upload acknowledgements
/// - Verify which calls were issued and in which order
#[derive(Clone)]
pub struct MockRemoteSession {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockRemoteSession {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }
}

impl MockRemoteSession {
    /// Create a new mock session
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection that already exists on the server
    pub fn add_collection(&self, title: &str, template: ListTemplate) -> CollectionRef {
        let collection = CollectionRef::new(title);
        let mut state = self.state.lock().unwrap();
        state.insert_collection(ListInfo {
            collection: collection.clone(),
            url: template.url_for(title),
            template,
            hidden: false,
            allow_deletion: true,
        });
        collection
    }

    /// Add `count` entries titled "Item <id>" and return their ids
    pub fn add_entries(&self, collection: &CollectionRef, count: usize) -> Vec<ItemId> {
        let mut state = self.state.lock().unwrap();
        let target = state
            .collections
            .get_mut(&collection.title)
            .expect("collection must be added before entries");
        (0..count)
            .map(|_| {
                let id = target.next_item_id;
                target.next_item_id += 1;
                target.entries.insert(
                    id,
                    Entry::new(id).with_field("Title", FieldValue::Text(format!("Item {}", id))),
                );
                id
            })
            .collect()
    }

    /// Add a folder (server relative url) that already exists on the server
    pub fn add_folder(&self, server_relative_url: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.folders.insert(server_relative_url.into());
    }

    /// Add a group that already exists on the server
    pub fn add_group(&self, title: &str) -> GroupInfo {
        let mut state = self.state.lock().unwrap();
        let group = GroupInfo {
            id: state.next_principal_id,
            login_name: title.to_string(),
            title: title.to_string(),
        };
        state.next_principal_id += 1;
        state.groups.push(group.clone());
        group
    }

    /// Make every call of `operation` (trait method name) fail with a server error
    pub fn fail_on(&self, operation: &str, message: impl Into<String>) {
        let mut state = self.state.lock().unwrap();
        state.failures.insert(operation.to_string(), message.into());
    }

    pub fn clear_failure(&self, operation: &str) {
        let mut state = self.state.lock().unwrap();
        state.failures.remove(operation);
    }

    /// Acknowledge this many bytes less than sent for every upload chunk
    pub fn set_upload_ack_shortfall(&self, bytes: u64) {
        let mut state = self.state.lock().unwrap();
        state.upload_ack_shortfall = bytes;
    }

    /// Entry count above which queries without a small enough row limit fail
    pub fn set_view_threshold(&self, threshold: Option<u64>) {
        let mut state = self.state.lock().unwrap();
        state.view_threshold = threshold;
    }

    /// Get all recorded calls in issue order
    pub fn calls(&self) -> Vec<RecordedCall> {
        let state = self.state.lock().unwrap();
        state.calls.clone()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.clear();
    }

    pub fn entry_ids(&self, collection: &CollectionRef) -> Vec<ItemId> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(&collection.title)
            .map(|c| c.entries.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn entry_count(&self, collection: &CollectionRef) -> usize {
        self.entry_ids(collection).len()
    }

    pub fn entry(&self, collection: &CollectionRef, item_id: ItemId) -> Option<Entry> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(&collection.title)
            .and_then(|c| c.entries.get(&item_id).cloned())
    }

    /// Get the stored content of a file
    pub fn file_content(&self, server_relative_url: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.files.get(server_relative_url).cloned()
    }

    pub fn folder_exists(&self, server_relative_url: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.folders.contains(server_relative_url)
    }

    /// Number of chunked uploads started but not finished
    pub fn open_upload_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.uploads.len()
    }

    /// Number of deletions queued but not executed
    pub fn pending_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.pending_deletes.len()
    }

    pub fn list_info(&self, title: &str) -> Option<ListInfo> {
        let state = self.state.lock().unwrap();
        state.collections.get(title).map(|c| c.info.clone())
    }

    pub fn inherits_roles(&self, collection: &CollectionRef) -> Option<bool> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(&collection.title)
            .map(|c| c.inherits_roles)
    }

    pub fn assignments(&self, scope: &RoleScope) -> Vec<RoleAssignment> {
        let state = self.state.lock().unwrap();
        state.role_assignments.get(scope).cloned().unwrap_or_default()
    }

    pub fn field_default(&self, collection: &CollectionRef, field_title: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .collections
            .get(&collection.title)
            .and_then(|c| c.field_defaults.get(field_title).cloned())
    }
}

#[async_trait]
impl RemoteSession for MockRemoteSession {
    async fn execute(&self) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        let pending = std::mem::take(&mut state.pending_deletes);
        state.calls.push(RecordedCall::Execute {
            flushed: pending.len(),
        });
        state.check_failure("execute")?;

        for (title, item_id) in pending {
            let collection = state.collection_mut(&title)?;
            if collection.entries.remove(&item_id).is_none() {
                return Err(RemoteError::Server(format!(
                    "Item {} does not exist. It may have been deleted by another user.",
                    item_id
                )));
            }
        }
        Ok(())
    }

    fn queue_delete(&self, collection: &CollectionRef, item_id: ItemId) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::QueueDelete {
            collection: collection.title.clone(),
            item_id,
        });
        state
            .pending_deletes
            .push((collection.title.clone(), item_id));
    }

    async fn item_count(&self, collection: &CollectionRef) -> Result<u64, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::ItemCount {
            collection: collection.title.clone(),
        });
        state.check_failure("item_count")?;
        Ok(state.collection(&collection.title)?.entries.len() as u64)
    }

    async fn get_items(
        &self,
        collection: &CollectionRef,
        query: &ItemQuery,
    ) -> Result<ItemPage, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::GetItems {
            collection: collection.title.clone(),
            row_limit: query.view.row_limit,
            cursor: query.position.as_ref().map(|c| c.as_str().to_string()),
        });
        state.check_failure("get_items")?;

        let view_threshold = state.view_threshold;
        let target = state.collection(&collection.title)?;

        if let Some(threshold) = view_threshold {
            let total = target.entries.len() as u64;
            let limit_too_large = query
                .view
                .row_limit
                .is_none_or(|limit| u64::from(limit) > threshold);
            if total > threshold && limit_too_large {
                return Err(RemoteError::Server(THRESHOLD_MESSAGE.to_string()));
            }
        }

        let start = match &query.position {
            Some(cursor) => parse_cursor(cursor)? + 1,
            None => ItemId::MIN,
        };
        let page_size = query
            .view
            .row_limit
            .map(|limit| (limit as usize).max(1))
            .unwrap_or(usize::MAX);

        let mut remaining = target
            .entries
            .range(start..)
            .map(|(_, entry)| entry)
            .filter(|entry| matches_filter(entry, &query.view));

        let entries: Vec<Entry> = remaining
            .by_ref()
            .take(page_size)
            .map(|entry| project(entry, &query.view))
            .collect();

        let next_cursor = if remaining.next().is_some() {
            entries
                .last()
                .map(|last| PageCursor::new(format!("{}{}", CURSOR_PREFIX, last.id)))
        } else {
            None
        };

        Ok(ItemPage {
            entries,
            next_cursor,
        })
    }

    async fn root_folder(&self, collection: &CollectionRef) -> Result<FolderRef, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::RootFolder {
            collection: collection.title.clone(),
        });
        state.check_failure("root_folder")?;
        Ok(FolderRef::new(
            state.collection(&collection.title)?.root_folder_url.clone(),
        ))
    }

    async fn get_folder(&self, server_relative_url: &str) -> Result<FolderRef, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::GetFolder {
            url: server_relative_url.to_string(),
        });
        state.check_failure("get_folder")?;
        if state.folders.contains(server_relative_url) {
            Ok(FolderRef::new(server_relative_url))
        } else {
            Err(RemoteError::NotFound(format!(
                "Folder '{}' does not exist",
                server_relative_url
            )))
        }
    }

    async fn get_file(&self, server_relative_url: &str) -> Result<FileHandle, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::GetFile {
            url: server_relative_url.to_string(),
        });
        state.check_failure("get_file")?;
        state
            .files
            .get(server_relative_url)
            .map(|content| file_handle(server_relative_url, content.len()))
            .ok_or_else(|| {
                RemoteError::NotFound(format!("File '{}' does not exist", server_relative_url))
            })
    }

    async fn create_file(
        &self,
        folder: &FolderRef,
        file_name: &str,
        content: &[u8],
    ) -> Result<FileHandle, RemoteError> {
        let url = folder.child_url(file_name);
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::CreateFile {
            url: url.clone(),
            length: content.len(),
        });
        state.check_failure("create_file")?;
        if !state.folders.contains(&folder.server_relative_url) {
            return Err(RemoteError::NotFound(format!(
                "Folder '{}' does not exist",
                folder.server_relative_url
            )));
        }
        state.files.insert(url.clone(), content.to_vec());
        state.record_file_entry(&url);
        Ok(file_handle(&url, content.len()))
    }

    async fn start_upload(
        &self,
        file: &FileHandle,
        upload_id: Uuid,
        chunk: &[u8],
    ) -> Result<ByteCount, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::StartUpload {
            url: file.server_relative_url.clone(),
            upload_id,
            length: chunk.len(),
        });
        state.check_failure("start_upload")?;
        if !state.files.contains_key(&file.server_relative_url) {
            return Err(RemoteError::NotFound(format!(
                "File '{}' does not exist",
                file.server_relative_url
            )));
        }
        let accepted = chunk
            .len()
            .saturating_sub(state.upload_ack_shortfall as usize);
        state.uploads.insert(
            upload_id,
            MockUpload {
                url: file.server_relative_url.clone(),
                received: chunk[..accepted].to_vec(),
            },
        );
        Ok(accepted as ByteCount)
    }

    async fn continue_upload(
        &self,
        file: &FileHandle,
        upload_id: Uuid,
        offset: ByteCount,
        chunk: &[u8],
    ) -> Result<ByteCount, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::ContinueUpload {
            url: file.server_relative_url.clone(),
            upload_id,
            offset,
            length: chunk.len(),
        });
        state.check_failure("continue_upload")?;
        let shortfall = state.upload_ack_shortfall as usize;
        let upload = checked_upload(&mut state.uploads, file, upload_id, offset)?;
        let accepted = chunk.len().saturating_sub(shortfall);
        upload.received.extend_from_slice(&chunk[..accepted]);
        Ok(upload.received.len() as ByteCount)
    }

    async fn finish_upload(
        &self,
        file: &FileHandle,
        upload_id: Uuid,
        offset: ByteCount,
        chunk: &[u8],
    ) -> Result<FileHandle, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::FinishUpload {
            url: file.server_relative_url.clone(),
            upload_id,
            offset,
            length: chunk.len(),
        });
        state.check_failure("finish_upload")?;
        checked_upload(&mut state.uploads, file, upload_id, offset)?;
        let mut upload = state
            .uploads
            .remove(&upload_id)
            .ok_or_else(|| RemoteError::NotFound(format!("Upload {} not found", upload_id)))?;
        upload.received.extend_from_slice(chunk);
        let handle = file_handle(&upload.url, upload.received.len());
        state.files.insert(upload.url.clone(), upload.received);
        state.record_file_entry(&handle.server_relative_url);
        Ok(handle)
    }
}

fn checked_upload<'a>(
    uploads: &'a mut HashMap<Uuid, MockUpload>,
    file: &FileHandle,
    upload_id: Uuid,
    offset: ByteCount,
) -> Result<&'a mut MockUpload, RemoteError> {
    let upload = uploads
        .get_mut(&upload_id)
        .ok_or_else(|| RemoteError::NotFound(format!("Upload {} not found", upload_id)))?;
    if upload.url != file.server_relative_url {
        return Err(RemoteError::Protocol(format!(
            "Upload {} belongs to '{}', not '{}'",
            upload_id, upload.url, file.server_relative_url
        )));
    }
    if upload.received.len() as ByteCount != offset {
        return Err(RemoteError::Server(format!(
            "Offset mismatch: server has {} bytes, client sent offset {}",
            upload.received.len(),
            offset
        )));
    }
    Ok(upload)
}

#[async_trait]
impl ProvisioningOps for MockRemoteSession {
    async fn find_lists_by_title(&self, title: &str) -> Result<Vec<ListInfo>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "find_lists_by_title",
        });
        state.check_failure("find_lists_by_title")?;
        Ok(state
            .collections
            .values()
            .filter(|c| c.info.collection.title == title)
            .map(|c| c.info.clone())
            .collect())
    }

    async fn create_list(&self, creation: &ListCreation) -> Result<ListInfo, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "create_list",
        });
        state.check_failure("create_list")?;
        if state.collections.contains_key(&creation.title) {
            return Err(RemoteError::Server(format!(
                "A list with the title '{}' already exists",
                creation.title
            )));
        }
        let info = ListInfo {
            collection: CollectionRef::new(creation.title.clone()),
            url: creation.url.clone(),
            template: creation.template,
            hidden: creation.hidden,
            allow_deletion: creation.allow_deletion,
        };
        state.insert_collection(info.clone());
        Ok(info)
    }

    async fn update_list(
        &self,
        collection: &CollectionRef,
        update: &ListUpdate,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "update_list",
        });
        state.check_failure("update_list")?;
        let mut target = state
            .collections
            .remove(&collection.title)
            .ok_or_else(|| {
                RemoteError::NotFound(format!("List '{}' does not exist", collection.title))
            })?;
        if let Some(allow_deletion) = update.allow_deletion {
            target.info.allow_deletion = allow_deletion;
        }
        if let Some(title) = &update.title {
            target.info.collection = CollectionRef::new(title.clone());
        }
        state
            .collections
            .insert(target.info.collection.title.clone(), target);
        Ok(())
    }

    async fn delete_list(&self, collection: &CollectionRef) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "delete_list",
        });
        state.check_failure("delete_list")?;
        if !state.collection(&collection.title)?.info.allow_deletion {
            return Err(RemoteError::Server(format!(
                "List '{}' does not allow deletion",
                collection.title
            )));
        }
        if let Some(removed) = state.collections.remove(&collection.title) {
            state.folders.remove(&removed.root_folder_url);
        }
        Ok(())
    }

    async fn set_field_default(
        &self,
        collection: &CollectionRef,
        field_title: &str,
        default_value: &str,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "set_field_default",
        });
        state.check_failure("set_field_default")?;
        state
            .collection_mut(&collection.title)?
            .field_defaults
            .insert(field_title.to_string(), default_value.to_string());
        Ok(())
    }

    async fn add_item(
        &self,
        collection: &CollectionRef,
        fields: &BTreeMap<String, FieldValue>,
    ) -> Result<Entry, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "add_item",
        });
        state.check_failure("add_item")?;
        let target = state.collection_mut(&collection.title)?;
        let id = target.next_item_id;
        target.next_item_id += 1;
        let mut entry = Entry::new(id);
        for (name, default) in &target.field_defaults {
            entry
                .fields
                .insert(name.clone(), FieldValue::Text(default.clone()));
        }
        entry.fields.extend(fields.clone());
        target.entries.insert(id, entry.clone());
        Ok(entry)
    }

    async fn create_folder(
        &self,
        parent: &FolderRef,
        name: &str,
    ) -> Result<FolderRef, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "create_folder",
        });
        state.check_failure("create_folder")?;
        if !state.folders.contains(&parent.server_relative_url) {
            return Err(RemoteError::NotFound(format!(
                "Folder '{}' does not exist",
                parent.server_relative_url
            )));
        }
        let url = parent.child_url(name);
        state.folders.insert(url.clone());
        Ok(FolderRef::new(url))
    }

    async fn find_groups_by_login(&self, login_name: &str) -> Result<Vec<GroupInfo>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "find_groups_by_login",
        });
        state.check_failure("find_groups_by_login")?;
        Ok(state
            .groups
            .iter()
            .filter(|g| g.login_name == login_name)
            .cloned()
            .collect())
    }

    async fn create_group(&self, title: &str) -> Result<GroupInfo, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "create_group",
        });
        state.check_failure("create_group")?;
        if state.groups.iter().any(|g| g.title == title) {
            return Err(RemoteError::Server(format!(
                "The specified name is already in use: {}",
                title
            )));
        }
        let group = GroupInfo {
            id: state.next_principal_id,
            login_name: title.to_string(),
            title: title.to_string(),
        };
        state.next_principal_id += 1;
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn role_assignments(
        &self,
        scope: &RoleScope,
    ) -> Result<Vec<RoleAssignment>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "role_assignments",
        });
        state.check_failure("role_assignments")?;
        if let RoleScope::Collection(collection) = scope {
            state.collection(&collection.title)?;
        }
        Ok(state
            .role_assignments
            .get(scope)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_role_assignment(
        &self,
        scope: &RoleScope,
        principal_id: i64,
        role: RoleType,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "add_role_assignment",
        });
        state.check_failure("add_role_assignment")?;
        let assignments = state.role_assignments.entry(scope.clone()).or_default();
        match assignments.iter_mut().find(|a| a.principal_id == principal_id) {
            Some(existing) if !existing.roles.contains(&role) => existing.roles.push(role),
            Some(_) => {}
            None => assignments.push(RoleAssignment {
                principal_id,
                roles: vec![role],
            }),
        }
        Ok(())
    }

    async fn remove_role_assignment(
        &self,
        scope: &RoleScope,
        principal_id: i64,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "remove_role_assignment",
        });
        state.check_failure("remove_role_assignment")?;
        let assignments = state.role_assignments.entry(scope.clone()).or_default();
        let before = assignments.len();
        assignments.retain(|a| a.principal_id != principal_id);
        if assignments.len() == before {
            return Err(RemoteError::NotFound(format!(
                "No role assignment for principal {}",
                principal_id
            )));
        }
        Ok(())
    }

    async fn break_role_inheritance(
        &self,
        collection: &CollectionRef,
        copy_assignments: bool,
    ) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall::Provisioning {
            operation: "break_role_inheritance",
        });
        state.check_failure("break_role_inheritance")?;
        let target = state.collection_mut(&collection.title)?;
        if !target.inherits_roles {
            // already broken, the collection keeps its own assignments
            return Ok(());
        }
        target.inherits_roles = false;
        let inherited = if copy_assignments {
            state
                .role_assignments
                .get(&RoleScope::Site)
                .cloned()
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        state
            .role_assignments
            .insert(RoleScope::Collection(collection.clone()), inherited);
        Ok(())
    }
}
