//! Hierarchical access control for workspaces, projects and (by delegation)
//! tasks.
//!
//! Every permission question reduces to two read lookups: the entity row
//! (`created_by`, `is_personal`) and the actor's membership row, if any. The
//! pair is combined by [`Access::derive`] into a single [`ResolvedRole`] which
//! is then matched against the capability a handler needs. Ownership is never
//! materialized as a membership row; creators get their rights purely from
//! `created_by`, which keeps personal entities (no memberships at all)
//! consistent with shared ones.

mod resolver;

pub use resolver::{resolve_access, resolve_task_access, TaskAccess};

use uuid::Uuid;

use crate::error::AppError;
use hacerya_shared::MemberRole;

/// The two entity types that own membership tables. Tasks and comments have
/// no memberships of their own; their scope is the parent project's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Workspace,
    Project,
}

/// The ownership fields of a workspace/project row, as read from the store.
#[derive(Debug, Clone, Copy)]
pub struct EntityRef {
    pub id: Uuid,
    pub created_by: Uuid,
    pub is_personal: bool,
}

/// The actor's effective role on one entity, resolved once per request.
/// `Creator` outranks `Admin`; a plain membership is `Member`; `None` means
/// no relationship at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedRole {
    Creator,
    Admin,
    Member,
    None,
}

/// What a handler needs to be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// View the entity and its children; create tasks/comments inside it.
    Read,
    /// Edit or delete the entity itself; change task due dates; delete tasks.
    Administer,
    /// Add, re-role or remove members. Never available on personal entities.
    ManageMembers,
}

/// The resolved (entity, actor) pair. All predicates are pure; the only I/O
/// happens earlier, in the `resolver` lookups.
#[derive(Debug, Clone, Copy)]
pub struct Access {
    pub entity: EntityRef,
    pub role: ResolvedRole,
}

impl Access {
    /// Combines the ownership field with the membership lookup. This is the
    /// single place where "creator implies member" is encoded.
    pub fn derive(entity: EntityRef, membership: Option<MemberRole>, user_id: Uuid) -> Self {
        let role = if entity.created_by == user_id {
            ResolvedRole::Creator
        } else {
            match membership {
                Some(MemberRole::Admin) => ResolvedRole::Admin,
                Some(MemberRole::Member) => ResolvedRole::Member,
                None => ResolvedRole::None,
            }
        };

        Self { entity, role }
    }

    pub fn can_read(&self) -> bool {
        !matches!(self.role, ResolvedRole::None)
    }

    pub fn can_administer(&self) -> bool {
        matches!(self.role, ResolvedRole::Creator | ResolvedRole::Admin)
    }

    pub fn can_manage_members(&self) -> bool {
        self.can_administer() && !self.entity.is_personal
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.can_read(),
            Capability::Administer => self.can_administer(),
            Capability::ManageMembers => self.can_manage_members(),
        }
    }

    /// Guard form of [`Self::allows`]. Member management on a personal entity
    /// is reported as an invariant violation rather than a plain denial, so
    /// the caller sees why even as a full admin the operation can never work.
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.allows(capability) {
            return Ok(());
        }

        if capability == Capability::ManageMembers
            && self.entity.is_personal
            && self.can_administer()
        {
            return Err(AppError::InvariantViolation(
                "Personal workspaces and projects do not have members".to_string(),
            ));
        }

        Err(AppError::Forbidden)
    }

    /// The creator can never be removed from the entity's membership,
    /// whoever asks.
    pub fn forbid_creator_removal(&self, member_id: Uuid) -> Result<(), AppError> {
        if self.entity.created_by == member_id {
            return Err(AppError::InvariantViolation(
                "The creator cannot be removed from the entity".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(created_by: Uuid, is_personal: bool) -> EntityRef {
        EntityRef {
            id: Uuid::new_v4(),
            created_by,
            is_personal,
        }
    }

    #[test]
    fn creator_has_access_without_membership_row() {
        let owner = Uuid::new_v4();
        let access = Access::derive(entity(owner, false), None, owner);

        assert_eq!(access.role, ResolvedRole::Creator);
        assert!(access.can_read());
        assert!(access.can_administer());
    }

    #[test]
    fn plain_member_cannot_administer() {
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let access = Access::derive(entity(owner, false), Some(MemberRole::Member), member);

        assert!(access.can_read());
        assert!(!access.can_administer());
        assert!(access.require(Capability::Administer).is_err());
    }

    #[test]
    fn admin_member_can_administer_but_is_not_creator() {
        let owner = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let access = Access::derive(entity(owner, false), Some(MemberRole::Admin), admin);

        assert_eq!(access.role, ResolvedRole::Admin);
        assert!(access.can_administer());
        assert!(access.can_manage_members());
    }

    #[test]
    fn stranger_has_no_access() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let access = Access::derive(entity(owner, false), None, stranger);

        assert_eq!(access.role, ResolvedRole::None);
        assert!(!access.can_read());
        assert!(matches!(
            access.require(Capability::Read),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn personal_entity_rejects_member_management_even_for_creator() {
        let owner = Uuid::new_v4();
        let access = Access::derive(entity(owner, true), None, owner);

        assert!(access.can_administer());
        assert!(!access.can_manage_members());
        assert!(matches!(
            access.require(Capability::ManageMembers),
            Err(AppError::InvariantViolation(_))
        ));
    }

    #[test]
    fn personal_entity_denies_outsider_with_plain_forbidden() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let access = Access::derive(entity(owner, true), None, stranger);

        assert!(matches!(
            access.require(Capability::ManageMembers),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn creator_removal_is_always_rejected() {
        let owner = Uuid::new_v4();
        let admin = Uuid::new_v4();

        // Even an entity admin cannot remove the creator.
        let access = Access::derive(entity(owner, false), Some(MemberRole::Admin), admin);
        assert!(matches!(
            access.forbid_creator_removal(owner),
            Err(AppError::InvariantViolation(_))
        ));

        // Removing anyone else passes this guard.
        assert!(access.forbid_creator_removal(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn membership_row_never_outranks_ownership() {
        // A creator who somehow also has a plain membership row still
        // resolves as Creator.
        let owner = Uuid::new_v4();
        let access = Access::derive(entity(owner, false), Some(MemberRole::Member), owner);

        assert_eq!(access.role, ResolvedRole::Creator);
        assert!(access.can_administer());
    }
}
