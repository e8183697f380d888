//! Role entity - a guild role with permissions

use serde::{Deserialize, Serialize};

use crate::value_objects::{Permissions, Snowflake};

/// Guild role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub color: i32,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub mentionable: bool,
}

impl Role {
    /// Check if this role grants a specific permission
    #[inline]
    pub fn has_permission(&self, permission: Permissions) -> bool {
        self.permissions.has(permission)
    }

    /// Compare role positions for hierarchy (higher position = more authority)
    #[inline]
    pub fn is_higher_than(&self, other: &Role) -> bool {
        self.position > other.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_decode() {
        let role: Role = serde_json::from_str(
            r#"{"id": "9", "name": "mod", "position": 3, "permissions": "8"}"#,
        )
        .unwrap();
        assert_eq!(role.name, "mod");
        assert!(role.has_permission(Permissions::BAN_MEMBERS));
    }

    #[test]
    fn test_role_hierarchy() {
        let top: Role = serde_json::from_str(r#"{"id": "1", "name": "a", "position": 5}"#).unwrap();
        let low: Role = serde_json::from_str(r#"{"id": "2", "name": "b", "position": 1}"#).unwrap();
        assert!(top.is_higher_than(&low));
        assert!(!low.is_higher_than(&top));
    }
}
