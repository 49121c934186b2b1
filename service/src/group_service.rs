use std::sync::Arc;

use core_types::{CollectionRef, RoleBinding, RoleType};
use remote_session::{GroupInfo, ProvisioningOps, RoleScope};

use crate::{
    error::{Error, require_non_empty},
    remote_call::call,
    settings::Settings,
};

/// Groups and the roles bound to them, site wide or per collection.
pub struct GroupService {
    ops: Arc<dyn ProvisioningOps>,
    settings: Arc<Settings>,
}

impl GroupService {
    pub fn new(ops: Arc<dyn ProvisioningOps>, settings: Arc<Settings>) -> Self {
        Self { ops, settings }
    }

    pub async fn group_exists(&self, login_name: &str) -> Result<bool, Error> {
        Ok(!self.find(login_name).await?.is_empty())
    }

    #[tracing::instrument(skip(self), err)]
    pub async fn create_group(&self, title: &str) -> Result<GroupInfo, Error> {
        if self.group_exists(title).await? {
            return Err(Error::AlreadyExists(format!("group '{}'", title)));
        }
        let group = call(
            self.settings.remote_call_timeout,
            "create_group",
            self.ops.create_group(title),
        )
        .await?;
        tracing::info!(id = group.id, "Created group '{}'", title);
        Ok(group)
    }

    pub async fn get_group(&self, login_name: &str) -> Result<GroupInfo, Error> {
        self.find(login_name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("group '{}'", login_name)))
    }

    /// Bind `role` to the group on the whole site.
    #[tracing::instrument(skip(self), err)]
    pub async fn add_role(&self, group_name: &str, role: RoleType) -> Result<(), Error> {
        let group = self.get_group(group_name).await?;
        call(
            self.settings.remote_call_timeout,
            "add_role_assignment",
            self.ops.add_role_assignment(&RoleScope::Site, group.id, role),
        )
        .await?;
        Ok(())
    }

    /// Remove every site wide role of the group. A group without roles is left as is.
    #[tracing::instrument(skip(self), err)]
    pub async fn clear_roles(&self, group_name: &str) -> Result<(), Error> {
        let group = self.get_group(group_name).await?;
        let timeout = self.settings.remote_call_timeout;
        let assignments = call(
            timeout,
            "role_assignments",
            self.ops.role_assignments(&RoleScope::Site),
        )
        .await?;
        if assignments.iter().any(|a| a.principal_id == group.id) {
            call(
                timeout,
                "remove_role_assignment",
                self.ops.remove_role_assignment(&RoleScope::Site, group.id),
            )
            .await?;
        }
        Ok(())
    }

    /// Replace the permissions of `collection` with exactly `bindings`.
    ///
    /// Inheritance from the site is broken without copying its assignments, existing
    /// assignments are removed last to first, then each binding is added. All groups are
    /// resolved up front so an unknown group changes nothing.
    #[tracing::instrument(skip_all, fields(collection = %collection, bindings = bindings.len()), err)]
    pub async fn set_roles(
        &self,
        collection: &CollectionRef,
        bindings: &[RoleBinding],
    ) -> Result<(), Error> {
        require_non_empty(&collection.title, "collection title")?;
        let mut resolved = Vec::with_capacity(bindings.len());
        for binding in bindings {
            resolved.push((self.get_group(&binding.group_name).await?, binding.role));
        }

        let timeout = self.settings.remote_call_timeout;
        let scope = RoleScope::Collection(collection.clone());
        call(
            timeout,
            "break_role_inheritance",
            self.ops.break_role_inheritance(collection, false),
        )
        .await?;

        let existing = call(timeout, "role_assignments", self.ops.role_assignments(&scope)).await?;
        for assignment in existing.iter().rev() {
            call(
                timeout,
                "remove_role_assignment",
                self.ops
                    .remove_role_assignment(&scope, assignment.principal_id),
            )
            .await?;
        }

        for (group, role) in resolved {
            tracing::debug!(group = %group.title, %role, "Binding role");
            call(
                timeout,
                "add_role_assignment",
                self.ops.add_role_assignment(&scope, group.id, role),
            )
            .await?;
        }
        Ok(())
    }

    async fn find(&self, login_name: &str) -> Result<Vec<GroupInfo>, Error> {
        require_non_empty(login_name, "group name")?;
        Ok(call(
            self.settings.remote_call_timeout,
            "find_groups_by_login",
            self.ops.find_groups_by_login(login_name),
        )
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ListTemplate;
    use remote_session::{MockRemoteSession, RoleAssignment};

    fn setup() -> (MockRemoteSession, GroupService) {
        let mock = MockRemoteSession::new();
        let service = GroupService::new(Arc::new(mock.clone()), Arc::new(Settings::default()));
        (mock, service)
    }

    #[async_std::test]
    async fn test_create_group_once() {
        let (_mock, service) = setup();

        let group = service.create_group("Editors").await.unwrap();
        assert_eq!(service.get_group("Editors").await.unwrap(), group);
        assert!(matches!(
            service.create_group("Editors").await,
            Err(Error::AlreadyExists(_))
        ));
    }

    #[async_std::test]
    async fn test_missing_group() {
        let (_mock, service) = setup();

        assert!(!service.group_exists("Ghosts").await.unwrap());
        assert!(matches!(
            service.add_role("Ghosts", RoleType::Reader).await,
            Err(Error::NotFound(_))
        ));
    }

    #[async_std::test]
    async fn test_add_and_clear_site_roles() {
        let (mock, service) = setup();
        let group = mock.add_group("Editors");

        service.add_role("Editors", RoleType::Editor).await.unwrap();
        service.add_role("Editors", RoleType::Reader).await.unwrap();
        assert_eq!(
            mock.assignments(&RoleScope::Site),
            vec![RoleAssignment {
                principal_id: group.id,
                roles: vec![RoleType::Editor, RoleType::Reader],
            }]
        );

        service.clear_roles("Editors").await.unwrap();
        assert!(mock.assignments(&RoleScope::Site).is_empty());
        // nothing left to clear
        service.clear_roles("Editors").await.unwrap();
    }

    #[async_std::test]
    async fn test_set_roles_replaces_assignments() {
        let (mock, service) = setup();
        let tasks = mock.add_collection("Tasks", ListTemplate::GenericList);
        let owners = mock.add_group("Owners");
        let visitors = mock.add_group("Visitors");
        service.add_role("Owners", RoleType::Administrator).await.unwrap();

        service
            .set_roles(&tasks, &[RoleBinding::new("Owners", RoleType::Contributor)])
            .await
            .unwrap();
        service
            .set_roles(
                &tasks,
                &[
                    RoleBinding::new("Visitors", RoleType::Reader),
                    RoleBinding::new("Owners", RoleType::WebDesigner),
                ],
            )
            .await
            .unwrap();

        assert_eq!(mock.inherits_roles(&tasks), Some(false));
        assert_eq!(
            mock.assignments(&RoleScope::Collection(tasks)),
            vec![
                RoleAssignment {
                    principal_id: visitors.id,
                    roles: vec![RoleType::Reader],
                },
                RoleAssignment {
                    principal_id: owners.id,
                    roles: vec![RoleType::WebDesigner],
                },
            ]
        );
    }

    #[async_std::test]
    async fn test_set_roles_with_unknown_group_changes_nothing() {
        let (mock, service) = setup();
        let tasks = mock.add_collection("Tasks", ListTemplate::GenericList);
        mock.add_group("Owners");

        let result = service
            .set_roles(
                &tasks,
                &[
                    RoleBinding::new("Owners", RoleType::Reader),
                    RoleBinding::new("Ghosts", RoleType::Reader),
                ],
            )
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(mock.inherits_roles(&tasks), Some(true));
    }
}
