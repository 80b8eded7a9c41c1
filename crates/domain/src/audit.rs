//! Batch classification of server members.
//!
//! Every member lands in exactly one of: affiliated (tracked guild and/or one
//! world bucket), unaffiliated, unregistered, or api error.

use std::collections::BTreeMap;

use crate::entities::{AccountSnapshot, Member, ServerConfig, WorldDirectory};
use crate::ids::MemberId;

/// What is known about a member's game account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberStanding {
    /// A stored key that the game API accepted.
    Registered(AccountSnapshot),
    /// No stored key.
    Unregistered,
    /// A stored key the game API refused or could not answer for.
    ApiError(String),
}

/// Where a member lands in an audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Affiliated {
        guild: bool,
        world: Option<String>,
    },
    /// Verified, but neither in the tracked guild nor on a known world.
    Unaffiliated,
    Unregistered,
    ApiError,
}

pub fn classify(
    standing: &MemberStanding,
    config: &ServerConfig,
    worlds: &WorldDirectory,
) -> Placement {
    match standing {
        MemberStanding::Unregistered => Placement::Unregistered,
        MemberStanding::ApiError(_) => Placement::ApiError,
        MemberStanding::Registered(snapshot) => {
            let guild = config
                .tracked_guild()
                .is_some_and(|guild| snapshot.is_in_guild(&guild.id));
            let world = worlds.name(snapshot.world).map(str::to_string);
            if guild || world.is_some() {
                Placement::Affiliated { guild, world }
            } else {
                Placement::Unaffiliated
            }
        }
    }
}

/// How a member is shown in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberLabel {
    pub id: MemberId,
    pub display_name: String,
    pub account_name: Option<String>,
}

impl MemberLabel {
    fn new(member: &Member, standing: &MemberStanding) -> Self {
        let account_name = match standing {
            MemberStanding::Registered(snapshot) => Some(snapshot.name.clone()),
            _ => None,
        };
        Self {
            id: member.id,
            display_name: member.display_name.clone(),
            account_name,
        }
    }
}

/// Grouped audit results for one server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub guild: Vec<MemberLabel>,
    pub worlds: BTreeMap<String, Vec<MemberLabel>>,
    pub unaffiliated: Vec<MemberLabel>,
    pub unregistered: Vec<MemberLabel>,
    pub api_error: Vec<MemberLabel>,
    pub total: usize,
}

impl AuditReport {
    pub fn record(
        &mut self,
        member: &Member,
        standing: &MemberStanding,
        config: &ServerConfig,
        worlds: &WorldDirectory,
    ) -> Placement {
        let label = MemberLabel::new(member, standing);
        let placement = classify(standing, config, worlds);
        self.total += 1;
        match &placement {
            Placement::Affiliated { guild, world } => {
                if *guild {
                    self.guild.push(label.clone());
                }
                if let Some(world) = world {
                    self.worlds.entry(world.clone()).or_default().push(label);
                }
            }
            Placement::Unaffiliated => self.unaffiliated.push(label),
            Placement::Unregistered => self.unregistered.push(label),
            Placement::ApiError => self.api_error.push(label),
        }
        placement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Guild, World};
    use crate::ids::{GuildId, WorldId};
    use std::collections::BTreeSet;

    fn worlds() -> WorldDirectory {
        WorldDirectory::from_worlds([
            World::from_api(WorldId::new(1001), "Devona's Rest"),
            World::from_api(WorldId::new(1002), "Ferguson's Crossing"),
        ])
    }

    fn config() -> ServerConfig {
        ServerConfig::unconfigured("server").with_guild(Some(Guild {
            id: GuildId::new("ABC").unwrap(),
            tag: "G1".into(),
            name: "G1".into(),
        }))
    }

    fn member(id: u64) -> Member {
        Member {
            id: MemberId::new(id),
            display_name: format!("member{id}"),
            roles: BTreeSet::new(),
            bot: false,
        }
    }

    fn registered(world: u32, guilds: &[&str]) -> MemberStanding {
        MemberStanding::Registered(AccountSnapshot {
            name: "Acc.1234".into(),
            world: WorldId::new(world),
            guilds: guilds.iter().map(|g| GuildId::new(*g).unwrap()).collect(),
        })
    }

    #[test]
    fn partitions_every_member_once() {
        let mut report = AuditReport::default();
        let cases = [
            (member(1), registered(1001, &["ABC"])),
            (member(2), registered(1002, &[])),
            (member(3), registered(9999, &[])),
            (member(4), MemberStanding::Unregistered),
            (member(5), MemberStanding::ApiError("401".into())),
            (member(6), registered(9999, &["ABC"])),
        ];
        for (m, standing) in &cases {
            report.record(m, standing, &config(), &worlds());
        }

        assert_eq!(report.total, 6);
        let guild_ids: Vec<u64> = report.guild.iter().map(|l| l.id.get()).collect();
        assert_eq!(guild_ids, vec![1, 6]);
        assert_eq!(report.worlds["Devona's Rest"].len(), 1);
        assert_eq!(report.worlds["Ferguson's Crossing"][0].id, MemberId::new(2));
        assert_eq!(report.unaffiliated[0].id, MemberId::new(3));
        assert_eq!(report.unregistered[0].id, MemberId::new(4));
        assert_eq!(report.api_error[0].id, MemberId::new(5));

        let world_entries: usize = report.worlds.values().map(Vec::len).sum();
        // Member 1 sits in both guild and a world bucket; everyone else once.
        assert_eq!(
            report.guild.len()
                + world_entries
                + report.unaffiliated.len()
                + report.unregistered.len()
                + report.api_error.len(),
            7
        );
    }

    #[test]
    fn guild_membership_requires_tracked_guild() {
        let placement = classify(
            &registered(9999, &["ABC"]),
            &ServerConfig::unconfigured("s"),
            &worlds(),
        );
        assert_eq!(placement, Placement::Unaffiliated);
    }

    #[test]
    fn labels_carry_account_name_when_registered() {
        let mut report = AuditReport::default();
        report.record(&member(1), &registered(1001, &[]), &config(), &worlds());
        report.record(&member(2), &MemberStanding::Unregistered, &config(), &worlds());
        assert_eq!(
            report.worlds["Devona's Rest"][0].account_name.as_deref(),
            Some("Acc.1234")
        );
        assert_eq!(report.unregistered[0].account_name, None);
    }
}
