//! Account lifecycle: first-sight registration from identity claims, caller
//! resolution, and admin moderation of users.

use std::sync::Arc;

use domains::{
    Actor, Clock, DomainError, IdentityClaims, Page, Paginated, Result, User, UserFilter, UserRepo,
    UserRole,
};
use uuid::Uuid;

use crate::access::require_admin;
use crate::Ports;

#[derive(Debug, Clone, Default)]
pub struct SignUp {
    pub role: Option<UserRole>,
    pub display_name: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepo>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(ports: &Ports) -> Self {
        Self { users: ports.users.clone(), clock: ports.clock.clone() }
    }

    /// Create-if-absent. Returns the user and whether it was just created.
    /// The requested role only applies on creation.
    pub async fn sync(&self, claims: &IdentityClaims, sign_up: SignUp) -> Result<(User, bool)> {
        if let Some(mut user) = self.users.find_by_external_id(&claims.external_id).await? {
            ensure_active(&user)?;
            if user.email != claims.email {
                user.email = claims.email.clone();
                user.updated_at = self.clock.now();
                self.users.update(&user).await?;
            }
            return Ok((user, false));
        }

        let role = sign_up.role.unwrap_or(UserRole::User);
        if !role.is_self_assignable() {
            return Err(DomainError::Authorization(format!("role {role} cannot be self-assigned")));
        }
        let display_name = sign_up
            .display_name
            .or_else(|| claims.name.clone())
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| claims.email.split('@').next().unwrap_or_default().to_string());

        let user = User::new(&claims.external_id, &claims.email, display_name, role, self.clock.now());
        match self.users.insert(user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, role = %user.role, "registered user");
                Ok((user, true))
            }
            // Lost a race against a concurrent first sign-in for the same subject.
            Err(DomainError::Conflict(_)) => {
                let user = self
                    .users
                    .find_by_external_id(&claims.external_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("User", &claims.external_id))?;
                Ok((user, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Maps verified claims to the caller of the current request.
    pub async fn resolve(&self, claims: &IdentityClaims) -> Result<(Actor, User)> {
        let user = self
            .users
            .find_by_external_id(&claims.external_id)
            .await?
            .ok_or_else(|| DomainError::Authentication("account is not registered".into()))?;
        ensure_active(&user)?;
        Ok((Actor::from(&user), user))
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.users.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("User", id))
    }

    pub async fn update_display_name(&self, actor: &Actor, display_name: &str) -> Result<User> {
        let display_name = display_name.trim();
        if display_name.is_empty() || display_name.chars().count() > 80 {
            return Err(DomainError::Validation("display name must be 1-80 characters".into()));
        }
        let mut user = self.get(actor.user_id).await?;
        user.display_name = display_name.to_string();
        user.updated_at = self.clock.now();
        self.users.update(&user).await?;
        Ok(user)
    }

    pub async fn list(&self, actor: &Actor, filter: &UserFilter, page: Page) -> Result<Paginated<User>> {
        require_admin(actor)?;
        self.users.list(filter, page).await
    }

    pub async fn change_role(&self, actor: &Actor, user_id: Uuid, role: UserRole) -> Result<User> {
        require_admin(actor)?;
        if user_id == actor.user_id {
            return Err(DomainError::Conflict("admins cannot change their own role".into()));
        }
        let mut user = self.get(user_id).await?;
        if user.role != role {
            tracing::info!(%user_id, from = %user.role, to = %role, admin = %actor.user_id, "changing user role");
            user.role = role;
            user.updated_at = self.clock.now();
            self.users.update(&user).await?;
        }
        Ok(user)
    }

    pub async fn set_active(&self, actor: &Actor, user_id: Uuid, is_active: bool) -> Result<User> {
        require_admin(actor)?;
        if user_id == actor.user_id && !is_active {
            return Err(DomainError::Conflict("admins cannot deactivate themselves".into()));
        }
        let mut user = self.get(user_id).await?;
        if user.is_active != is_active {
            tracing::info!(%user_id, is_active, admin = %actor.user_id, "changing user status");
            user.is_active = is_active;
            user.updated_at = self.clock.now();
            self.users.update(&user).await?;
        }
        Ok(user)
    }

    pub async fn count_by_role(&self) -> Result<Vec<(UserRole, u64)>> {
        self.users.count_by_role().await
    }
}

fn ensure_active(user: &User) -> Result<()> {
    if user.is_active {
        Ok(())
    } else {
        Err(DomainError::Authorization("account has been deactivated".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domains::{MockClock, MockUserRepo};
    use std::sync::Arc;

    fn service(users: MockUserRepo) -> UserService {
        let mut clock = MockClock::new();
        clock.expect_now().returning(|| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        UserService { users: Arc::new(users), clock: Arc::new(clock) }
    }

    fn claims() -> IdentityClaims {
        IdentityClaims { external_id: "idp|42".into(), email: "sam@example.com".into(), name: None }
    }

    #[tokio::test]
    async fn sync_creates_user_with_requested_role() {
        let mut users = MockUserRepo::new();
        users.expect_find_by_external_id().returning(|_| Ok(None));
        users.expect_insert().returning(Ok);

        let (user, created) = service(users)
            .sync(&claims(), SignUp { role: Some(UserRole::FacilityOwner), display_name: None })
            .await
            .unwrap();
        assert!(created);
        assert_eq!(user.role, UserRole::FacilityOwner);
        assert_eq!(user.display_name, "sam");
    }

    #[tokio::test]
    async fn sync_refuses_admin_self_assignment() {
        let mut users = MockUserRepo::new();
        users.expect_find_by_external_id().returning(|_| Ok(None));
        users.expect_insert().never();

        let err = service(users)
            .sync(&claims(), SignUp { role: Some(UserRole::Admin), display_name: None })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Authorization(_)));
    }

    #[tokio::test]
    async fn resolve_rejects_deactivated_accounts() {
        let mut users = MockUserRepo::new();
        users.expect_find_by_external_id().returning(|_| {
            let mut user = User::new("idp|42", "sam@example.com", "Sam", UserRole::User, Utc::now());
            user.is_active = false;
            Ok(Some(user))
        });

        let err = service(users).resolve(&claims()).await.unwrap_err();
        assert!(matches!(err, DomainError::Authorization(_)));
    }
}
