use core_types::{CollectionRef, ListTemplate, RoleType};

/// Collection metadata as reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListInfo {
    pub collection: CollectionRef,
    pub url: String,
    pub template: ListTemplate,
    pub hidden: bool,
    pub allow_deletion: bool,
}

/// Everything the store needs to create a collection in one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCreation {
    pub title: String,
    pub url: String,
    pub template: ListTemplate,
    pub image_url: String,
    pub hidden: bool,
    pub enable_attachments: bool,
    pub enable_folder_creation: bool,
    pub enable_minor_versions: bool,
    pub enable_versioning: bool,
    pub allow_deletion: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListUpdate {
    pub title: Option<String>,
    pub allow_deletion: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: i64,
    pub login_name: String,
    pub title: String,
}

/// Where a role assignment lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleScope {
    Site,
    Collection(CollectionRef),
}

/// All roles one principal holds in a scope. A principal has at most one assignment per scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub principal_id: i64,
    pub roles: Vec<RoleType>,
}
