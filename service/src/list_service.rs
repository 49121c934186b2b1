use std::sync::Arc;

use core_types::{CollectionRef, ListTemplate};
use remote_session::{ListCreation, ListInfo, ListUpdate, ProvisioningOps};

use crate::{
    error::{Error, require_non_empty},
    remote_call::call,
    settings::Settings,
};

/// Creates, looks up, renames and removes collections.
pub struct ListService {
    ops: Arc<dyn ProvisioningOps>,
    settings: Arc<Settings>,
}

impl ListService {
    pub fn new(ops: Arc<dyn ProvisioningOps>, settings: Arc<Settings>) -> Self {
        Self { ops, settings }
    }

    /// Generic list at `Lists/<internal_name>`, titled `display_name`.
    pub async fn create_list(
        &self,
        internal_name: &str,
        display_name: &str,
    ) -> Result<ListInfo, Error> {
        self.create(internal_name, display_name, ListTemplate::GenericList)
            .await
    }

    pub async fn create_library(
        &self,
        internal_name: &str,
        display_name: &str,
    ) -> Result<ListInfo, Error> {
        self.create(internal_name, display_name, ListTemplate::DocumentLibrary)
            .await
    }

    pub async fn create_page_library(
        &self,
        internal_name: &str,
        display_name: &str,
    ) -> Result<ListInfo, Error> {
        self.create(internal_name, display_name, ListTemplate::WebPageLibrary)
            .await
    }

    #[tracing::instrument(skip(self), err)]
    async fn create(
        &self,
        internal_name: &str,
        display_name: &str,
        template: ListTemplate,
    ) -> Result<ListInfo, Error> {
        require_non_empty(internal_name, "internal name")?;
        require_non_empty(display_name, "display name")?;

        if self.list_exists(display_name).await? {
            return Err(Error::AlreadyExists(format!(
                "list '{}' already exists",
                display_name
            )));
        }

        let creation = ListCreation {
            title: display_name.to_string(),
            url: template.url_for(internal_name),
            template,
            image_url: template.image_url().to_string(),
            hidden: false,
            enable_attachments: false,
            enable_folder_creation: false,
            enable_minor_versions: false,
            enable_versioning: false,
            allow_deletion: false,
        };
        let info = call(
            self.settings.remote_call_timeout,
            "create_list",
            self.ops.create_list(&creation),
        )
        .await?;
        tracing::info!(url = %info.url, "Created {}", template);
        Ok(info)
    }

    pub async fn list_exists(&self, title: &str) -> Result<bool, Error> {
        Ok(!self.find(title).await?.is_empty())
    }

    pub async fn get_list(&self, title: &str) -> Result<ListInfo, Error> {
        self.find(title)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("list '{}'", title)))
    }

    #[tracing::instrument(skip(self), err)]
    pub async fn rename_list(&self, current_title: &str, new_title: &str) -> Result<(), Error> {
        require_non_empty(new_title, "new title")?;
        let info = self.get_list(current_title).await?;
        let update = ListUpdate {
            title: Some(new_title.to_string()),
            ..Default::default()
        };
        call(
            self.settings.remote_call_timeout,
            "update_list",
            self.ops.update_list(&info.collection, &update),
        )
        .await?;
        Ok(())
    }

    /// Lists are created undeletable, so deletion is switched on first.
    #[tracing::instrument(skip(self), err)]
    pub async fn delete_list(&self, title: &str) -> Result<(), Error> {
        let info = self.get_list(title).await?;
        let timeout = self.settings.remote_call_timeout;
        if !info.allow_deletion {
            let update = ListUpdate {
                allow_deletion: Some(true),
                ..Default::default()
            };
            call(
                timeout,
                "update_list",
                self.ops.update_list(&info.collection, &update),
            )
            .await?;
        }
        call(timeout, "delete_list", self.ops.delete_list(&info.collection)).await?;
        tracing::info!("Deleted list '{}'", title);
        Ok(())
    }

    async fn find(&self, title: &str) -> Result<Vec<ListInfo>, Error> {
        require_non_empty(title, "list title")?;
        Ok(call(
            self.settings.remote_call_timeout,
            "find_lists_by_title",
            self.ops.find_lists_by_title(title),
        )
        .await?)
    }
}
