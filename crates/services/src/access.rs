//! Role and ownership checks shared by every service. These run before any
//! mutation so a rejected call never leaves partial state.

use domains::{Actor, DomainError, Result, UserRole, Venue};

pub fn require_role(actor: &Actor, allowed: &[UserRole]) -> Result<()> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(DomainError::Authorization(format!(
            "role {} may not perform this operation",
            actor.role
        )))
    }
}

pub fn require_admin(actor: &Actor) -> Result<()> {
    require_role(actor, &[UserRole::Admin])
}

/// Strict ownership: only the facility owner who registered the venue.
pub fn require_owner(actor: &Actor, venue: &Venue) -> Result<()> {
    if venue.is_owned_by(actor.user_id) {
        Ok(())
    } else {
        Err(DomainError::Authorization(format!("venue {} is not owned by the caller", venue.id)))
    }
}

/// The owner or any admin.
pub fn require_manager(actor: &Actor, venue: &Venue) -> Result<()> {
    if actor.is_admin() {
        return Ok(());
    }
    require_owner(actor, venue)
}

/// Whether the caller may see a venue that is not publicly listed.
pub fn can_see_hidden(actor: Option<&Actor>, venue: &Venue) -> bool {
    actor.is_some_and(|a| a.is_admin() || venue.is_owned_by(a.user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn require_role_rejects_other_roles() {
        let actor = Actor { user_id: Uuid::new_v4(), role: UserRole::User };
        assert!(require_role(&actor, &[UserRole::User, UserRole::FacilityOwner]).is_ok());
        assert!(matches!(require_admin(&actor), Err(DomainError::Authorization(_))));
    }
}
