use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

pub mod events;
pub mod field_value;
pub mod role_type;

pub use field_value::FieldValue;
pub use role_type::{RoleBinding, RoleType};

pub type ItemId = i64;
pub type ByteCount = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum CoreTypeError {
    ConversionError(String),
    InvalidFieldValue(String),
}

impl std::fmt::Display for CoreTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreTypeError::ConversionError(msg) => write!(f, "Conversion Error: {}", msg),
            CoreTypeError::InvalidFieldValue(msg) => write!(f, "Invalid Field Value: {}", msg),
        }
    }
}

impl std::error::Error for CoreTypeError {}

/// Handle to a remote collection (a list or a document library), addressed by its title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionRef {
    pub title: String,
}

impl CollectionRef {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl std::fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderRef {
    pub server_relative_url: String,
}

impl FolderRef {
    pub fn new(server_relative_url: impl Into<String>) -> Self {
        Self {
            server_relative_url: server_relative_url.into(),
        }
    }

    /// Server relative url of a direct child (file or folder) of this folder.
    pub fn child_url(&self, name: &str) -> String {
        format!("{}/{}", self.server_relative_url.trim_end_matches('/'), name)
    }
}

/// A persisted remote file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub server_relative_url: String,
    pub name: String,
    pub length: ByteCount,
}

/// One entry (list item) of a remote collection as returned by a paged query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: ItemId,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Entry {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, field_name: &str) -> Option<&FieldValue> {
        self.fields.get(field_name)
    }

    pub fn title(&self) -> Option<&str> {
        match self.fields.get("Title") {
            Some(FieldValue::Text(title)) => Some(title.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Copy, EnumIter, Display, Serialize, Deserialize)]
pub enum ListTemplate {
    #[strum(serialize = "Generic List")]
    GenericList,
    #[strum(serialize = "Document Library")]
    DocumentLibrary,
    #[strum(serialize = "Web Page Library")]
    WebPageLibrary,
}

impl ListTemplate {
    pub fn template_id(&self) -> i32 {
        match self {
            ListTemplate::GenericList => 100,
            ListTemplate::DocumentLibrary => 101,
            ListTemplate::WebPageLibrary => 119,
        }
    }

    /// Url of a new collection. Generic lists live under `Lists/`, libraries at the web root.
    pub fn url_for(&self, internal_name: &str) -> String {
        match self {
            ListTemplate::GenericList => format!("Lists/{}", internal_name),
            _ => internal_name.to_string(),
        }
    }

    pub fn image_url(&self) -> &'static str {
        match self {
            ListTemplate::GenericList => "/_layouts/15/images/itgen.gif?rev=45",
            _ => "/_layouts/15/images/itdl.gif?rev=45",
        }
    }
}

impl TryFrom<i32> for ListTemplate {
    type Error = CoreTypeError;
    fn try_from(value: i32) -> Result<Self, CoreTypeError> {
        match value {
            100 => Ok(ListTemplate::GenericList),
            101 => Ok(ListTemplate::DocumentLibrary),
            119 => Ok(ListTemplate::WebPageLibrary),
            _ => Err(CoreTypeError::ConversionError(format!(
                "Failed convert {} to ListTemplate",
                value
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Copy, EnumIter, Display)]
pub enum SettingName {
    UploadChunkSizeMb,
    PageRowLimit,
    DeleteBatchLimit,
    RemoteCallTimeoutSecs,
}

impl SettingName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingName::UploadChunkSizeMb => "upload_chunk_size_mb",
            SettingName::PageRowLimit => "page_row_limit",
            SettingName::DeleteBatchLimit => "delete_batch_limit",
            SettingName::RemoteCallTimeoutSecs => "remote_call_timeout_secs",
        }
    }

    pub fn env_key(&self) -> String {
        format!("STORE_{}", self.as_str().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_list_template_url() {
        assert_eq!(ListTemplate::GenericList.url_for("Tasks"), "Lists/Tasks");
        assert_eq!(ListTemplate::DocumentLibrary.url_for("Docs"), "Docs");
        assert_eq!(ListTemplate::WebPageLibrary.url_for("Pages"), "Pages");
    }

    #[test]
    fn test_list_template_id_conversion() {
        for template in ListTemplate::iter() {
            assert_eq!(
                ListTemplate::try_from(template.template_id()).unwrap(),
                template
            );
        }
        assert!(ListTemplate::try_from(42).is_err());
    }

    #[test]
    fn test_setting_env_key() {
        assert_eq!(
            SettingName::UploadChunkSizeMb.env_key(),
            "STORE_UPLOAD_CHUNK_SIZE_MB"
        );
        assert_eq!(SettingName::PageRowLimit.env_key(), "STORE_PAGE_ROW_LIMIT");
    }

    #[test]
    fn test_folder_child_url() {
        let folder = FolderRef::new("/sites/dev/Docs/");
        assert_eq!(folder.child_url("a.txt"), "/sites/dev/Docs/a.txt");
    }

    #[test]
    fn test_entry_title() {
        let entry = Entry::new(1).with_field("Title", FieldValue::Text("First".to_string()));
        assert_eq!(entry.title(), Some("First"));
        assert_eq!(Entry::new(2).title(), None);
    }
}
