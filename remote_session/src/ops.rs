use std::collections::BTreeMap;

use async_trait::async_trait;
use core_types::{
    ByteCount, CollectionRef, Entry, FieldValue, FileHandle, FolderRef, ItemId, RoleType,
};
use uuid::Uuid;

use crate::{
    RemoteError,
    provisioning::{GroupInfo, ListCreation, ListInfo, ListUpdate, RoleAssignment, RoleScope},
    query::{ItemPage, ItemQuery},
};

/// Remote session used by the upload and bulk operations.
///
/// Trait so that the operations can be driven by a mock in tests and by
/// different transports in production.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Flush every mutation queued on this session in one round trip.
    async fn execute(&self) -> Result<(), RemoteError>;

    /// Buffer deletion of an entry. Nothing is sent until `execute`.
    fn queue_delete(&self, collection: &CollectionRef, item_id: ItemId);

    /// Total number of entries in the collection.
    async fn item_count(&self, collection: &CollectionRef) -> Result<u64, RemoteError>;

    /// Fetch one page of entries starting at `query.position`.
    async fn get_items(
        &self,
        collection: &CollectionRef,
        query: &ItemQuery,
    ) -> Result<ItemPage, RemoteError>;

    async fn root_folder(&self, collection: &CollectionRef) -> Result<FolderRef, RemoteError>;

    async fn get_folder(&self, server_relative_url: &str) -> Result<FolderRef, RemoteError>;

    async fn get_file(&self, server_relative_url: &str) -> Result<FileHandle, RemoteError>;

    /// Create (or overwrite) a file with its whole content in a single call.
    async fn create_file(
        &self,
        folder: &FolderRef,
        file_name: &str,
        content: &[u8],
    ) -> Result<FileHandle, RemoteError>;

    /// Begin a chunked upload bound to `upload_id`. Returns the server acknowledged offset.
    async fn start_upload(
        &self,
        file: &FileHandle,
        upload_id: Uuid,
        chunk: &[u8],
    ) -> Result<ByteCount, RemoteError>;

    /// Append a chunk at `offset`. Returns the server acknowledged offset.
    async fn continue_upload(
        &self,
        file: &FileHandle,
        upload_id: Uuid,
        offset: ByteCount,
        chunk: &[u8],
    ) -> Result<ByteCount, RemoteError>;

    /// Append the final chunk and commit the file.
    async fn finish_upload(
        &self,
        file: &FileHandle,
        upload_id: Uuid,
        offset: ByteCount,
        chunk: &[u8],
    ) -> Result<FileHandle, RemoteError>;
}

/// Single call provisioning operations on lists, groups, roles and entries.
#[async_trait]
pub trait ProvisioningOps: Send + Sync {
    async fn find_lists_by_title(&self, title: &str) -> Result<Vec<ListInfo>, RemoteError>;

    async fn create_list(&self, creation: &ListCreation) -> Result<ListInfo, RemoteError>;

    async fn update_list(
        &self,
        collection: &CollectionRef,
        update: &ListUpdate,
    ) -> Result<(), RemoteError>;

    async fn delete_list(&self, collection: &CollectionRef) -> Result<(), RemoteError>;

    async fn set_field_default(
        &self,
        collection: &CollectionRef,
        field_title: &str,
        default_value: &str,
    ) -> Result<(), RemoteError>;

    async fn add_item(
        &self,
        collection: &CollectionRef,
        fields: &BTreeMap<String, FieldValue>,
    ) -> Result<Entry, RemoteError>;

    async fn create_folder(&self, parent: &FolderRef, name: &str)
    -> Result<FolderRef, RemoteError>;

    async fn find_groups_by_login(&self, login_name: &str) -> Result<Vec<GroupInfo>, RemoteError>;

    async fn create_group(&self, title: &str) -> Result<GroupInfo, RemoteError>;

    async fn role_assignments(&self, scope: &RoleScope)
    -> Result<Vec<RoleAssignment>, RemoteError>;

    async fn add_role_assignment(
        &self,
        scope: &RoleScope,
        principal_id: i64,
        role: RoleType,
    ) -> Result<(), RemoteError>;

    async fn remove_role_assignment(
        &self,
        scope: &RoleScope,
        principal_id: i64,
    ) -> Result<(), RemoteError>;

    async fn break_role_inheritance(
        &self,
        collection: &CollectionRef,
        copy_assignments: bool,
    ) -> Result<(), RemoteError>;
}
