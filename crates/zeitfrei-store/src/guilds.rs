//! Registry of guild role mappings.

use rusqlite::{Row, params};
use tracing::{debug, info};
use zeitfrei_types::{GuildId, GuildRoleMapping, RoleId};

use crate::db::{Database, column_id, is_constraint_violation};
use crate::error::{Result, StoreError};

const SELECT_MAPPING: &str = "SELECT guild_id, unauth_role_id, auth_role_id, reauth_day FROM guild";

/// Access to the `guild` table.
///
/// Mappings are returned in registration order.
#[derive(Debug, Clone)]
pub struct GuildRegistry {
    db: Database,
}

impl GuildRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register a mapping. Fails with [`StoreError::DuplicateMapping`] if the
    /// exact triple is already present.
    pub fn add_mapping(&self, mapping: &GuildRoleMapping) -> Result<()> {
        let result = self.db.conn().execute(
            "INSERT INTO guild (guild_id, unauth_role_id, auth_role_id, reauth_day) VALUES (?1, ?2, ?3, ?4)",
            params![
                mapping.guild_id.to_string(),
                mapping.unauth_role_id.to_string(),
                mapping.auth_role_id.to_string(),
                mapping.reauth_day,
            ],
        );

        match result {
            Ok(_) => {
                info!(
                    guild_id = %mapping.guild_id,
                    unauth_role_id = %mapping.unauth_role_id,
                    auth_role_id = %mapping.auth_role_id,
                    "Registered guild mapping"
                );
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => Err(StoreError::DuplicateMapping {
                guild_id: mapping.guild_id,
                unauth_role_id: mapping.unauth_role_id,
                auth_role_id: mapping.auth_role_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a mapping. Fails with [`StoreError::MappingNotFound`] if absent.
    pub fn remove_mapping(&self, guild_id: GuildId, unauth_role_id: RoleId, auth_role_id: RoleId) -> Result<()> {
        let deleted = self.db.conn().execute(
            "DELETE FROM guild WHERE guild_id = ?1 AND unauth_role_id = ?2 AND auth_role_id = ?3",
            params![
                guild_id.to_string(),
                unauth_role_id.to_string(),
                auth_role_id.to_string()
            ],
        )?;

        if deleted == 0 {
            return Err(StoreError::MappingNotFound {
                guild_id,
                unauth_role_id,
                auth_role_id,
            });
        }

        info!(%guild_id, %unauth_role_id, %auth_role_id, "Removed guild mapping");
        Ok(())
    }

    /// Every registered mapping.
    pub fn list(&self) -> Result<Vec<GuildRoleMapping>> {
        self.query(&format!("{} ORDER BY rowid", SELECT_MAPPING), &[])
    }

    /// All mappings registered for one guild.
    pub fn find_by_guild(&self, guild_id: GuildId) -> Result<Vec<GuildRoleMapping>> {
        self.query(
            &format!("{} WHERE guild_id = ?1 ORDER BY rowid", SELECT_MAPPING),
            &[guild_id.to_string()],
        )
    }

    /// All mappings using this role pair, in any guild.
    pub fn find_by_role_pair(&self, unauth_role_id: RoleId, auth_role_id: RoleId) -> Result<Vec<GuildRoleMapping>> {
        self.query(
            &format!(
                "{} WHERE unauth_role_id = ?1 AND auth_role_id = ?2 ORDER BY rowid",
                SELECT_MAPPING
            ),
            &[unauth_role_id.to_string(), auth_role_id.to_string()],
        )
    }

    fn query(&self, sql: &str, args: &[String]) -> Result<Vec<GuildRoleMapping>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), row_to_mapping)?;
        let mappings = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(count = mappings.len(), "Loaded guild mappings");
        Ok(mappings)
    }
}

fn row_to_mapping(row: &Row<'_>) -> rusqlite::Result<GuildRoleMapping> {
    Ok(GuildRoleMapping {
        guild_id: column_id(row, 0)?,
        unauth_role_id: column_id(row, 1)?,
        auth_role_id: column_id(row, 2)?,
        reauth_day: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> GuildRegistry {
        GuildRegistry::new(Database::open_in_memory().unwrap())
    }

    fn mapping(guild: u64, unauth: u64, auth: u64) -> GuildRoleMapping {
        GuildRoleMapping::new(GuildId(guild), RoleId(unauth), RoleId(auth), 30)
    }

    #[test]
    fn test_duplicate_rejected_and_single_row_kept() {
        let registry = registry();
        registry.add_mapping(&mapping(1, 2, 3)).unwrap();

        let err = registry.add_mapping(&mapping(1, 2, 3)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateMapping { .. }));

        let rows = registry.find_by_guild(GuildId(1)).unwrap();
        assert_eq!(rows, vec![mapping(1, 2, 3)]);
    }

    #[test]
    fn test_guild_may_hold_several_pairs() {
        let registry = registry();
        registry.add_mapping(&mapping(1, 2, 3)).unwrap();
        registry.add_mapping(&mapping(1, 4, 5)).unwrap();
        registry.add_mapping(&mapping(6, 6, 7)).unwrap();

        assert_eq!(registry.find_by_guild(GuildId(1)).unwrap().len(), 2);
        assert_eq!(registry.list().unwrap().len(), 3);
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let registry = registry();
        registry.add_mapping(&mapping(30, 31, 32)).unwrap();
        registry.add_mapping(&mapping(10, 11, 12)).unwrap();
        registry.add_mapping(&mapping(20, 21, 22)).unwrap();

        let guilds: Vec<u64> = registry.list().unwrap().iter().map(|m| m.guild_id.get()).collect();
        assert_eq!(guilds, vec![30, 10, 20]);
    }

    #[test]
    fn test_remove_mapping() {
        let registry = registry();
        registry.add_mapping(&mapping(1, 2, 3)).unwrap();

        registry.remove_mapping(GuildId(1), RoleId(2), RoleId(3)).unwrap();
        assert!(registry.list().unwrap().is_empty());

        let err = registry
            .remove_mapping(GuildId(1), RoleId(2), RoleId(3))
            .unwrap_err();
        assert!(matches!(err, StoreError::MappingNotFound { .. }));
    }

    #[test]
    fn test_find_by_role_pair_spans_guilds() {
        let registry = registry();
        registry.add_mapping(&mapping(1, 2, 3)).unwrap();
        registry.add_mapping(&mapping(9, 2, 3)).unwrap();
        registry.add_mapping(&mapping(9, 2, 4)).unwrap();

        let found = registry.find_by_role_pair(RoleId(2), RoleId(3)).unwrap();
        let guilds: Vec<GuildId> = found.iter().map(|m| m.guild_id).collect();
        assert_eq!(guilds, vec![GuildId(1), GuildId(9)]);

        assert!(registry.find_by_role_pair(RoleId(3), RoleId(2)).unwrap().is_empty());
    }

    #[test]
    fn test_reauth_day_round_trips() {
        let registry = registry();
        registry
            .add_mapping(&GuildRoleMapping::new(GuildId(1), RoleId(2), RoleId(3), 14))
            .unwrap();
        assert_eq!(registry.list().unwrap()[0].reauth_day, 14);
    }
}
