//! Plain-text rendering of command results.

use std::fmt::Write;

use gw2link_domain::{AuditReport, MemberLabel, ServerConfig};

use crate::infrastructure::ports::ServerSummary;
use crate::use_cases::{DebugReport, PurgeReport, RefreshReport, WorldRoleChange, WorldRoleStatus};

fn label(label: &MemberLabel) -> String {
    match &label.account_name {
        Some(account) => format!("{} ({account})", label.display_name),
        None => label.display_name.clone(),
    }
}

fn section(out: &mut String, title: &str, members: &[MemberLabel]) {
    if members.is_empty() {
        return;
    }
    let _ = writeln!(out, "**{title}** ({})", members.len());
    for member in members {
        let _ = writeln!(out, "- {}", label(member));
    }
}

fn tracked(config: &ServerConfig) -> String {
    match config.tracked_guild() {
        Some(guild) => guild.to_string(),
        None => "No guild configured".to_string(),
    }
}

pub fn audit(report: &AuditReport, config: &ServerConfig) -> String {
    let mut out = format!("Audit of {} members\n", report.total);
    if let Some(guild) = config.tracked_guild() {
        section(&mut out, &guild.to_string(), &report.guild);
    }
    for (world, members) in &report.worlds {
        section(&mut out, world, members);
    }
    section(&mut out, "Unaffiliated", &report.unaffiliated);
    section(&mut out, "Unregistered", &report.unregistered);
    section(&mut out, "API error", &report.api_error);
    out
}

pub fn refresh(report: &RefreshReport) -> String {
    let mut out = format!(
        "Refresh complete: {} updated, {} unchanged, {} unregistered, {} API errors, {} failed\n",
        report.updated.len(),
        report.unchanged,
        report.unregistered,
        report.api_error.len(),
        report.failed.len(),
    );
    section(&mut out, "Updated", &report.updated);
    section(&mut out, "API error", &report.api_error);
    section(&mut out, "Failed", &report.failed);
    out
}

pub fn purge(report: &PurgeReport) -> String {
    let mut out = format!(
        "Purge complete: {} kept, {} in other servers, {} removed, {} API errors, {} failed\n",
        report.kept.len(),
        report.elsewhere,
        report.removed.len(),
        report.api_error.len(),
        report.failed.len(),
    );
    for name in &report.removed {
        let _ = writeln!(out, "{name} already removed from Discord - removing from database.");
    }
    section(&mut out, "API error", &report.api_error);
    out
}

pub fn servers(servers: &[(ServerSummary, ServerConfig)]) -> String {
    if servers.is_empty() {
        return "Not in any servers".to_string();
    }
    let mut out = String::new();
    for (server, config) in servers {
        let _ = writeln!(out, "{} ({}): {}", server.name, server.id, tracked(config));
    }
    out
}

pub fn world_roles(statuses: &[WorldRoleStatus]) -> String {
    let provisioned = statuses.iter().filter(|s| s.role.is_some()).count();
    let mut out = format!("{} worlds, {provisioned} with a role\n", statuses.len());
    for status in statuses {
        let marker = if status.role.is_some() { "role" } else { "no role" };
        let _ = writeln!(out, "{} ({}): {marker}", status.world.name, status.world.id);
    }
    out
}

pub fn world_role_change(change: &WorldRoleChange) -> String {
    match change {
        WorldRoleChange::Created { world, .. } => format!("Created role for {}", world.name),
        WorldRoleChange::Removed { world, .. } => format!("Removed role for {}", world.name),
        WorldRoleChange::Unchanged { world } => format!("Nothing to do for {}", world.name),
    }
}

pub fn debug(report: &DebugReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Worlds loaded: {}", report.world_count);
    let _ = writeln!(out, "Server name: {}", report.config.name);
    let _ = writeln!(out, "Tracked guild: {}", tracked(&report.config));
    let _ = writeln!(out, "Roles on server: {}", report.role_count);
    let _ = writeln!(out, "Managed roles present: {}", report.provisioned.len());
    if !report.missing.is_empty() {
        let _ = writeln!(out, "Managed roles missing: {}", report.missing.join(", "));
    }
    let _ = match &report.caller_account {
        Some(account) => writeln!(out, "Your account: {account}"),
        None => writeln!(out, "Your account: not registered"),
    };
    out
}

pub fn guild(config: &ServerConfig) -> String {
    tracked(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw2link_domain::{Guild, GuildId, MemberId};

    fn member(id: u64, account: Option<&str>) -> MemberLabel {
        MemberLabel {
            id: MemberId::new(id),
            display_name: format!("user{id}"),
            account_name: account.map(str::to_string),
        }
    }

    #[test]
    fn audit_lists_sections_with_counts() {
        let config = ServerConfig::unconfigured("s").with_guild(Some(Guild {
            id: GuildId::new("A").unwrap(),
            tag: "G1".into(),
            name: "Guild One".into(),
        }));
        let mut report = AuditReport {
            total: 3,
            ..Default::default()
        };
        report.guild.push(member(1, Some("Acc.1")));
        report
            .worlds
            .insert("Devona's Rest".into(), vec![member(1, Some("Acc.1"))]);
        report.unregistered.push(member(2, None));

        let text = audit(&report, &config);
        assert!(text.starts_with("Audit of 3 members\n"));
        assert!(text.contains("**[G1] Guild One** (1)\n- user1 (Acc.1)"));
        assert!(text.contains("**Devona's Rest** (1)"));
        assert!(text.contains("**Unregistered** (1)\n- user2"));
        assert!(!text.contains("API error"));
    }

    #[test]
    fn purge_mentions_removed_accounts() {
        let report = PurgeReport {
            removed: vec!["Gone.1234".into()],
            ..Default::default()
        };
        assert!(purge(&report)
            .contains("Gone.1234 already removed from Discord - removing from database."));
    }

    #[test]
    fn guild_without_tracking() {
        assert_eq!(guild(&ServerConfig::default()), "No guild configured");
    }
}
