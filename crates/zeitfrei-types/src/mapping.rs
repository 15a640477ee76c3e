//! Guild role mappings.

use serde::{Deserialize, Serialize};

use crate::ids::{GuildId, RoleId};

/// An unauthorized → authorized role pair registered for a guild.
///
/// `(guild_id, unauth_role_id, auth_role_id)` is the identity; a guild may
/// carry several pairs. `reauth_day` is stored and returned to bots but not
/// acted on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuildRoleMapping {
    pub guild_id: GuildId,
    #[serde(alias = "unauth_role")]
    pub unauth_role_id: RoleId,
    #[serde(alias = "auth_role")]
    pub auth_role_id: RoleId,
    #[serde(default = "default_reauth_day")]
    pub reauth_day: u32,
}

fn default_reauth_day() -> u32 {
    crate::defaults::REAUTH_DAYS
}

impl GuildRoleMapping {
    pub fn new(guild_id: GuildId, unauth_role_id: RoleId, auth_role_id: RoleId, reauth_day: u32) -> Self {
        Self {
            guild_id,
            unauth_role_id,
            auth_role_id,
            reauth_day,
        }
    }

    /// Whether the unauthorized role is a real role rather than `@everyone`.
    ///
    /// `@everyone` cannot be granted or revoked, so role swaps skip it.
    pub fn has_distinct_unauth_role(&self) -> bool {
        self.unauth_role_id != RoleId::everyone(self.guild_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everyone_unauth_role_is_not_distinct() {
        let everyone = GuildRoleMapping::new(GuildId(10), RoleId(10), RoleId(11), 30);
        assert!(!everyone.has_distinct_unauth_role());

        let tiered = GuildRoleMapping::new(GuildId(10), RoleId(12), RoleId(11), 30);
        assert!(tiered.has_distinct_unauth_role());
    }

    #[test]
    fn test_deserialize_legacy_field_names() {
        let json = r#"{"guild_id": 1, "unauth_role": "2", "auth_role": 3}"#;
        let mapping: GuildRoleMapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.unauth_role_id, RoleId(2));
        assert_eq!(mapping.auth_role_id, RoleId(3));
        assert_eq!(mapping.reauth_day, crate::defaults::REAUTH_DAYS);
    }

    #[test]
    fn test_serialize_shape() {
        let mapping = GuildRoleMapping::new(GuildId(1), RoleId(2), RoleId(3), 7);
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["guild_id"], "1");
        assert_eq!(json["unauth_role_id"], "2");
        assert_eq!(json["auth_role_id"], "3");
        assert_eq!(json["reauth_day"], 7);
    }
}
