use std::sync::{Arc, OnceLock};

use remote_session::{ProvisioningOps, RemoteSession};

use crate::{
    bulk::BulkService, group_service::GroupService, item_service::ItemService,
    list_service::ListService, settings::Settings, upload::UploadService,
};

/// All services around one shared session. Each service is built on first use.
pub struct AppServices {
    upload: OnceLock<Arc<UploadService>>,
    bulk: OnceLock<Arc<BulkService>>,
    list: OnceLock<Arc<ListService>>,
    group: OnceLock<Arc<GroupService>>,
    item: OnceLock<Arc<ItemService>>,
    session: Arc<dyn RemoteSession>,
    ops: Arc<dyn ProvisioningOps>,
    settings: Arc<Settings>,
}

impl AppServices {
    pub fn new<S>(session: Arc<S>, settings: Arc<Settings>) -> Self
    where
        S: RemoteSession + ProvisioningOps + 'static,
    {
        Self {
            upload: OnceLock::new(),
            bulk: OnceLock::new(),
            list: OnceLock::new(),
            group: OnceLock::new(),
            item: OnceLock::new(),
            session: session.clone(),
            ops: session,
            settings,
        }
    }

    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }

    pub fn upload(&self) -> Arc<UploadService> {
        self.upload
            .get_or_init(|| {
                Arc::new(UploadService::new(
                    Arc::clone(&self.session),
                    Arc::clone(&self.settings),
                ))
            })
            .clone()
    }

    pub fn bulk(&self) -> Arc<BulkService> {
        self.bulk
            .get_or_init(|| {
                Arc::new(BulkService::new(
                    Arc::clone(&self.session),
                    Arc::clone(&self.settings),
                ))
            })
            .clone()
    }

    pub fn list(&self) -> Arc<ListService> {
        self.list
            .get_or_init(|| {
                Arc::new(ListService::new(
                    Arc::clone(&self.ops),
                    Arc::clone(&self.settings),
                ))
            })
            .clone()
    }

    pub fn group(&self) -> Arc<GroupService> {
        self.group
            .get_or_init(|| {
                Arc::new(GroupService::new(
                    Arc::clone(&self.ops),
                    Arc::clone(&self.settings),
                ))
            })
            .clone()
    }

    pub fn item(&self) -> Arc<ItemService> {
        self.item
            .get_or_init(|| {
                Arc::new(ItemService::new(
                    Arc::clone(&self.session),
                    Arc::clone(&self.ops),
                    Arc::clone(&self.settings),
                ))
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ListTemplate;
    use remote_session::MockRemoteSession;

    #[async_std::test]
    async fn test_services_share_one_session() {
        let mock = Arc::new(MockRemoteSession::new());
        let services = AppServices::new(mock.clone(), Arc::new(Settings::default()));

        let info = services.list().create_library("docs", "Docs").await.unwrap();
        services
            .upload()
            .upload_file(&info.collection, "hello.txt", b"hello", None)
            .await
            .unwrap();
        let entries = services
            .bulk()
            .fetch_all(&info.collection, &["FileLeafRef"], None)
            .await
            .unwrap();

        assert_eq!(info.template, ListTemplate::DocumentLibrary);
        assert_eq!(entries.len(), 1);
        assert!(Arc::ptr_eq(&services.bulk(), &services.bulk()));
    }
}
