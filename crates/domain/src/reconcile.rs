//! Role reconciliation.
//!
//! Computes the exact role set a member should hold from their live game
//! account. Managed roles (the tracked guild's role and one role per known
//! world) are stripped and then re-granted from source data, so the result
//! never depends on what the member held before and running it twice gives
//! the same answer.

use std::collections::BTreeSet;

use crate::entities::{AccountSnapshot, RoleDirectory, ServerConfig, WorldDirectory};
use crate::ids::RoleId;

/// Managed roles granted by a reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Grants {
    pub guild: Option<RoleId>,
    pub world: Option<RoleId>,
}

/// Outcome of reconciling one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePlan {
    pub current: BTreeSet<RoleId>,
    pub target: BTreeSet<RoleId>,
    pub grants: Grants,
}

impl RolePlan {
    /// Roles the member gains.
    pub fn added(&self) -> BTreeSet<RoleId> {
        self.target.difference(&self.current).copied().collect()
    }

    /// Roles the member loses.
    pub fn removed(&self) -> BTreeSet<RoleId> {
        self.current.difference(&self.target).copied().collect()
    }

    pub fn is_noop(&self) -> bool {
        self.current == self.target
    }
}

/// Ids of every managed role provisioned on the server.
///
/// Managed names are the tracked guild's role name (when a guild is tracked)
/// and every world name in the directory. Names with no provisioned role are
/// skipped.
pub fn managed_role_ids(
    config: &ServerConfig,
    roles: &RoleDirectory,
    worlds: &WorldDirectory,
) -> BTreeSet<RoleId> {
    let guild_role = config
        .tracked_guild()
        .and_then(|guild| roles.resolve(guild.role_name()));

    worlds
        .names()
        .filter_map(|name| roles.resolve(name))
        .chain(guild_role)
        .collect()
}

/// Compute the target role set for a member.
pub fn reconcile(
    current: &BTreeSet<RoleId>,
    config: &ServerConfig,
    roles: &RoleDirectory,
    snapshot: &AccountSnapshot,
    worlds: &WorldDirectory,
) -> RolePlan {
    let managed = managed_role_ids(config, roles, worlds);
    let mut target: BTreeSet<RoleId> = current.difference(&managed).copied().collect();

    let guild = config
        .tracked_guild()
        .filter(|guild| snapshot.is_in_guild(&guild.id))
        .and_then(|guild| roles.resolve(guild.role_name()));

    let world = worlds
        .name(snapshot.world)
        .and_then(|name| roles.resolve(name));

    target.extend(guild);
    target.extend(world);

    RolePlan {
        current: current.clone(),
        target,
        grants: Grants { guild, world },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Guild, PlatformRole, World};
    use crate::ids::{GuildId, WorldId};

    const UNMANAGED: RoleId = RoleId::new(1);
    const DEVONA: RoleId = RoleId::new(101);
    const FERGUSON: RoleId = RoleId::new(102);
    const GUILD_ROLE: RoleId = RoleId::new(200);

    fn worlds() -> WorldDirectory {
        WorldDirectory::from_worlds([
            World::from_api(WorldId::new(1001), "Devona's Rest"),
            World::from_api(WorldId::new(1002), "Ferguson's Crossing"),
        ])
    }

    fn guild() -> Guild {
        Guild {
            id: GuildId::new("ABC").unwrap(),
            tag: "G1".into(),
            name: "G1".into(),
        }
    }

    fn tracked() -> ServerConfig {
        ServerConfig::unconfigured("server").with_guild(Some(guild()))
    }

    fn roles() -> RoleDirectory {
        RoleDirectory::from_roles([
            PlatformRole { id: UNMANAGED, name: "unmanaged1".into() },
            PlatformRole { id: DEVONA, name: "Devona's Rest".into() },
            PlatformRole { id: FERGUSON, name: "Ferguson's Crossing".into() },
            PlatformRole { id: GUILD_ROLE, name: "G1".into() },
        ])
    }

    fn snapshot(world: u32, guilds: &[&str]) -> AccountSnapshot {
        AccountSnapshot {
            name: "Player.1234".into(),
            world: WorldId::new(world),
            guilds: guilds.iter().map(|g| GuildId::new(*g).unwrap()).collect(),
        }
    }

    fn set(ids: &[RoleId]) -> BTreeSet<RoleId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn moves_member_to_current_world_and_grants_guild() {
        let current = set(&[UNMANAGED, FERGUSON]);
        let plan = reconcile(&current, &tracked(), &roles(), &snapshot(1001, &["ABC"]), &worlds());

        assert_eq!(plan.target, set(&[UNMANAGED, GUILD_ROLE, DEVONA]));
        assert_eq!(plan.added(), set(&[GUILD_ROLE, DEVONA]));
        assert_eq!(plan.removed(), set(&[FERGUSON]));
        assert_eq!(plan.grants.guild, Some(GUILD_ROLE));
        assert_eq!(plan.grants.world, Some(DEVONA));
    }

    #[test]
    fn reconciling_a_reconciled_member_is_a_noop() {
        let first = reconcile(
            &set(&[UNMANAGED, FERGUSON]),
            &tracked(),
            &roles(),
            &snapshot(1001, &["ABC"]),
            &worlds(),
        );
        let second = reconcile(
            &first.target,
            &tracked(),
            &roles(),
            &snapshot(1001, &["ABC"]),
            &worlds(),
        );
        assert!(second.is_noop());
        assert_eq!(second.target, first.target);
    }

    #[test]
    fn unmanaged_roles_are_never_touched() {
        let stray = RoleId::new(999);
        let current = set(&[UNMANAGED, stray]);
        let plan = reconcile(&current, &tracked(), &roles(), &snapshot(4242, &[]), &worlds());
        assert_eq!(plan.target, current);
    }

    #[test]
    fn guild_role_removed_when_member_left_guild() {
        let current = set(&[GUILD_ROLE, DEVONA]);
        let plan = reconcile(&current, &tracked(), &roles(), &snapshot(1001, &["OTHER"]), &worlds());
        assert_eq!(plan.target, set(&[DEVONA]));
        assert_eq!(plan.grants.guild, None);
    }

    #[test]
    fn no_guild_grant_without_tracked_guild() {
        let config = ServerConfig::unconfigured("server");
        let plan = reconcile(&BTreeSet::new(), &config, &roles(), &snapshot(1001, &["ABC"]), &worlds());
        assert_eq!(plan.target, set(&[DEVONA]));
    }

    #[test]
    fn untracked_guild_role_is_unmanaged() {
        // Without a tracked guild, a role that happens to share the guild's
        // name belongs to someone else.
        let config = ServerConfig::unconfigured("server");
        let current = set(&[GUILD_ROLE]);
        let plan = reconcile(&current, &config, &roles(), &snapshot(1001, &[]), &worlds());
        assert_eq!(plan.target, set(&[GUILD_ROLE, DEVONA]));
    }

    #[test]
    fn missing_role_is_skipped_not_an_error() {
        let roles = RoleDirectory::from_roles([PlatformRole {
            id: UNMANAGED,
            name: "unmanaged1".into(),
        }]);
        let current = set(&[UNMANAGED]);
        let plan = reconcile(&current, &tracked(), &roles, &snapshot(1001, &["ABC"]), &worlds());
        assert!(plan.is_noop());
        assert_eq!(plan.grants, Grants::default());
    }

    #[test]
    fn unknown_world_grants_nothing_but_still_strips() {
        let current = set(&[FERGUSON]);
        let plan = reconcile(&current, &tracked(), &roles(), &snapshot(3003, &[]), &worlds());
        assert!(plan.target.is_empty());
        assert_eq!(plan.grants.world, None);
    }

    #[test]
    fn managed_ids_cover_guild_and_worlds_only() {
        let ids = managed_role_ids(&tracked(), &roles(), &worlds());
        assert_eq!(ids, set(&[DEVONA, FERGUSON, GUILD_ROLE]));
    }
}
