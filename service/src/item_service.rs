use std::{collections::BTreeMap, sync::Arc};

use core_types::{CollectionRef, Entry, FieldValue, FolderRef};
use remote_session::{ItemQuery, ProvisioningOps, RemoteError, RemoteSession, ViewDefinition};

use crate::{
    bulk::scanner::classify_page_error,
    error::{Error, require_non_empty},
    path::path_segments,
    remote_call::call,
    settings::Settings,
};

/// Single entries, field defaults and folders inside a collection.
pub struct ItemService {
    session: Arc<dyn RemoteSession>,
    ops: Arc<dyn ProvisioningOps>,
    settings: Arc<Settings>,
}

impl ItemService {
    pub fn new(
        session: Arc<dyn RemoteSession>,
        ops: Arc<dyn ProvisioningOps>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            session,
            ops,
            settings,
        }
    }

    /// Add one entry. Every value is checked before the request is sent.
    #[tracing::instrument(skip_all, fields(collection = %collection, fields = fields.len()), err)]
    pub async fn add_item(
        &self,
        collection: &CollectionRef,
        fields: &BTreeMap<String, FieldValue>,
    ) -> Result<Entry, Error> {
        require_non_empty(&collection.title, "collection title")?;
        if fields.is_empty() {
            return Err(Error::PreconditionViolation(
                "an entry needs at least one field".to_string(),
            ));
        }
        for (name, value) in fields {
            require_non_empty(name, "field name")?;
            value.validate()?;
        }

        let entry = call(
            self.settings.remote_call_timeout,
            "add_item",
            self.ops.add_item(collection, fields),
        )
        .await?;
        tracing::debug!(id = entry.id, "Added entry");
        Ok(entry)
    }

    pub async fn set_field_default_value(
        &self,
        collection: &CollectionRef,
        field_title: &str,
        default_value: &str,
    ) -> Result<(), Error> {
        require_non_empty(&collection.title, "collection title")?;
        require_non_empty(field_title, "field title")?;
        call(
            self.settings.remote_call_timeout,
            "set_field_default",
            self.ops
                .set_field_default(collection, field_title, default_value),
        )
        .await?;
        Ok(())
    }

    /// Whether a file with this server relative url is stored anywhere in the collection.
    pub async fn file_exists(
        &self,
        collection: &CollectionRef,
        server_relative_url: &str,
    ) -> Result<bool, Error> {
        require_non_empty(server_relative_url, "file url")?;
        let view = ViewDefinition::new()
            .recursive()
            .with_fields(["ID"])
            .where_eq("FileRef", "Url", server_relative_url)
            .with_row_limit(1);
        let page = call(
            self.settings.remote_call_timeout,
            "get_items",
            self.session
                .get_items(collection, &ItemQuery::new(view, None)),
        )
        .await
        .map_err(classify_page_error)?;
        Ok(!page.entries.is_empty())
    }

    /// Make sure every folder of `path` exists below the collection root, creating the
    /// missing ones one level at a time. Returns the deepest folder.
    #[tracing::instrument(skip(self, collection), fields(collection = %collection), err)]
    pub async fn ensure_folder_path(
        &self,
        collection: &CollectionRef,
        path: &str,
    ) -> Result<FolderRef, Error> {
        let segments = path_segments(path)?;
        let timeout = self.settings.remote_call_timeout;
        let mut folder = call(timeout, "root_folder", self.session.root_folder(collection)).await?;

        for segment in &segments {
            let url = folder.child_url(segment);
            folder = match call(timeout, "get_folder", self.session.get_folder(&url)).await {
                Ok(existing) => existing,
                Err(RemoteError::NotFound(_)) => {
                    tracing::debug!("Creating folder {}", url);
                    call(
                        timeout,
                        "create_folder",
                        self.ops.create_folder(&folder, segment),
                    )
                    .await?
                }
                Err(e) => return Err(e.into()),
            };
        }
        Ok(folder)
    }
}
