use crate::models::entity::Tracked;
use crate::models::event::StageEvent;

/// Identity of the person acting, passed explicitly to anything that needs
/// ownership checks. Authentication happens elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUserContext {
    pub user_id: Option<String>,
    pub is_admin: bool,
}

impl CurrentUserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_admin: false,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    /// True when the user owns the entity. Anonymous users own nothing.
    pub fn is_owner<T: Tracked>(&self, entity: &T) -> bool {
        match (&self.user_id, entity.owner()) {
            (Some(user), Some(owner)) => user == owner,
            _ => false,
        }
    }

    /// True when the user recorded the stage change
    pub fn is_author(&self, event: &StageEvent) -> bool {
        match (&self.user_id, &event.changed_by) {
            (Some(user), Some(author)) => user == author,
            _ => false,
        }
    }

    /// Owners and admins may modify. Unowned entities are open to everyone.
    pub fn can_modify<T: Tracked>(&self, entity: &T) -> bool {
        self.is_admin || entity.owner().is_none() || self.is_owner(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Project;

    fn owned_by(owner: Option<&str>) -> Project {
        let mut project = Project::new("Portal".to_string());
        project.owner = owner.map(str::to_string);
        project
    }

    #[test]
    fn test_is_owner() {
        let alice = CurrentUserContext::new("alice");
        assert!(alice.is_owner(&owned_by(Some("alice"))));
        assert!(!alice.is_owner(&owned_by(Some("bob"))));
        assert!(!alice.is_owner(&owned_by(None)));
        assert!(!CurrentUserContext::anonymous().is_owner(&owned_by(None)));
    }

    #[test]
    fn test_can_modify() {
        let alice = CurrentUserContext::new("alice");
        assert!(alice.can_modify(&owned_by(Some("alice"))));
        assert!(!alice.can_modify(&owned_by(Some("bob"))));
        assert!(alice.can_modify(&owned_by(None)));
        assert!(alice.clone().with_admin(true).can_modify(&owned_by(Some("bob"))));
    }

    #[test]
    fn test_is_author() {
        let event = StageEvent {
            id: Some(1),
            entity_table: "projects".to_string(),
            entity_id: 1,
            from_stage: None,
            to_stage: "sow".to_string(),
            changed_by: Some("alice".to_string()),
            changed_ts: 0,
        };
        assert!(CurrentUserContext::new("alice").is_author(&event));
        assert!(!CurrentUserContext::new("bob").is_author(&event));
    }
}
