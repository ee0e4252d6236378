use serde::{Deserialize, Serialize};

use crate::messenger::{RoleId, UserId};

/// The member who invoked a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoker {
    pub user_id: UserId,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
}

/// Decides whether a member may run moderation commands.
pub trait AccessPolicy: Send + Sync {
    fn is_staff(&self, invoker: &Invoker) -> bool;

    fn name(&self) -> &'static str;
}

/// Staff are the members holding one configured role.
pub struct StaffRolePolicy {
    role: RoleId,
}

impl StaffRolePolicy {
    pub fn new(role: RoleId) -> Self {
        Self { role }
    }
}

impl AccessPolicy for StaffRolePolicy {
    fn is_staff(&self, invoker: &Invoker) -> bool {
        invoker.role_ids.contains(&self.role)
    }

    fn name(&self) -> &'static str {
        "staff_role"
    }
}

/// Everyone counts as staff.
pub struct OpenPolicy;

impl AccessPolicy for OpenPolicy {
    fn is_staff(&self, _invoker: &Invoker) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "open"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_role_policy() {
        let policy = StaffRolePolicy::new(RoleId(7));
        let staff = Invoker {
            user_id: UserId(1),
            role_ids: vec![RoleId(3), RoleId(7)],
        };
        let member = Invoker {
            user_id: UserId(2),
            role_ids: vec![RoleId(3)],
        };
        assert!(policy.is_staff(&staff));
        assert!(!policy.is_staff(&member));
    }

    #[test]
    fn test_invoker_roles_default_empty() {
        let invoker: Invoker = serde_json::from_str(r#"{"user_id": "12"}"#).unwrap();
        assert_eq!(invoker.user_id, UserId(12));
        assert!(invoker.role_ids.is_empty());
        assert!(OpenPolicy.is_staff(&invoker));
    }
}
