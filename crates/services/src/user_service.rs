use std::sync::Arc;

use club_core::model::{User, UserId};
use club_core::{Actor, Permission, Role};
use storage::repository::{StorageError, UserRepository};

use crate::error::UserServiceError;

/// Profiles and role administration.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// The caller's own profile.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::Access` for anonymous callers.
    pub async fn me(&self, actor: &Actor) -> Result<User, UserServiceError> {
        let me = actor.require(Permission::ViewOwnProfile)?;
        Ok(self
            .users
            .get_user(me.user_id)
            .await?
            .ok_or(StorageError::NotFound)?)
    }

    /// # Errors
    ///
    /// Returns `UserServiceError::Access` unless the caller is an admin.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<User>, UserServiceError> {
        actor.require(Permission::ManageUsers)?;
        Ok(self.users.list_users().await?)
    }

    /// Give another user a new role.
    ///
    /// # Errors
    ///
    /// Returns `UserServiceError::Access` unless the caller is an admin,
    /// `UserServiceError::SelfRoleChange` when targeting the caller, and a
    /// `NotFound` storage error for an unknown user.
    pub async fn assign_role(
        &self,
        actor: &Actor,
        user_id: UserId,
        role: Role,
    ) -> Result<User, UserServiceError> {
        let admin = actor.require(Permission::ManageUsers)?;
        if admin.user_id == user_id {
            return Err(UserServiceError::SelfRoleChange);
        }
        let user = self.users.set_role(user_id, role).await?;
        tracing::info!(user_id = %user_id, role = %role, by = %admin.user_id, "role assigned");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use club_core::AccessError;
    use club_core::model::Email;
    use club_core::time::fixed_now;
    use storage::repository::{NewUserRecord, Storage};

    async fn add(storage: &Storage, email: &str, role: Role) -> User {
        storage
            .users
            .insert_user(NewUserRecord {
                name: "Member".into(),
                email: Email::parse(email).unwrap(),
                password_hash: "h".into(),
                role,
                year: None,
                created_at: fixed_now(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn admin_promotes_but_cannot_change_own_role() {
        let storage = Storage::in_memory();
        let service = UserService::new(Arc::clone(&storage.users));
        let admin = add(&storage, "admin@club.io", Role::Admin).await;
        let member = add(&storage, "m@club.io", Role::Public).await;
        let actor = Actor::user(admin.id, Role::Admin);

        let promoted = service.assign_role(&actor, member.id, Role::Junior).await.unwrap();
        assert_eq!(promoted.role, Role::Junior);

        let err = service
            .assign_role(&actor, admin.id, Role::Public)
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::SelfRoleChange));
        assert_eq!(service.me(&actor).await.unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn listing_users_needs_admin() {
        let storage = Storage::in_memory();
        let service = UserService::new(Arc::clone(&storage.users));
        let junior = add(&storage, "j@club.io", Role::Junior).await;
        assert!(matches!(
            service.list(&Actor::user(junior.id, Role::Junior)).await,
            Err(UserServiceError::Access(AccessError::Forbidden(_)))
        ));
        assert!(matches!(
            service.me(&Actor::Anonymous).await,
            Err(UserServiceError::Access(AccessError::Unauthenticated))
        ));
    }
}
