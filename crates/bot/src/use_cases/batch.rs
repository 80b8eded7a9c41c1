//! Whole-server batch operations: audit, refresh and purge.
//!
//! Per-member work runs with bounded concurrency. A failure for one member is
//! captured in the report and never aborts the batch.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use gw2link_domain::{
    Account, AuditReport, Member, MemberId, MemberLabel, MemberStanding, ServerConfig, ServerId,
};

use crate::infrastructure::ports::{AccountRepo, ChatPlatformPort, GameApiPort, PlatformError, RepoError};
use crate::use_cases::reconcile::{ReconcileError, ReconcileMember, ServerContext};
use crate::use_cases::server_config::ServerConfigOps;
use crate::use_cases::worlds::{WorldDirectoryError, WorldDirectoryService};

/// Members requested per page; the platform's maximum.
pub const MEMBER_PAGE_SIZE: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Worlds(#[from] WorldDirectoryError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

// =============================================================================
// Roster: member listing and account lookups shared by every batch
// =============================================================================

pub struct Roster {
    platform: Arc<dyn ChatPlatformPort>,
    api: Arc<dyn GameApiPort>,
    accounts: Arc<dyn AccountRepo>,
    concurrency: usize,
}

impl Roster {
    pub fn new(
        platform: Arc<dyn ChatPlatformPort>,
        api: Arc<dyn GameApiPort>,
        accounts: Arc<dyn AccountRepo>,
        concurrency: usize,
    ) -> Self {
        Self {
            platform,
            api,
            accounts,
            concurrency: concurrency.max(1),
        }
    }

    /// Every human member of the server, paging by last seen id.
    pub async fn members(&self, server: ServerId) -> Result<Vec<Member>, PlatformError> {
        let mut members = Vec::new();
        let mut after = None;
        loop {
            let page = self
                .platform
                .members_page(server, after, MEMBER_PAGE_SIZE)
                .await?;
            let full_page = page.len() as u32 >= MEMBER_PAGE_SIZE;
            after = page.iter().map(|m| m.id).max();
            members.extend(page.into_iter().filter(|m| !m.bot));
            if !full_page || after.is_none() {
                break;
            }
        }
        tracing::debug!(server_id = %server, members = members.len(), "Fetched member list");
        Ok(members)
    }

    /// Stored account and live standing for one member.
    async fn standing(&self, member: MemberId) -> (Option<Account>, MemberStanding) {
        let account = match self.accounts.get(member).await {
            Ok(Some(account)) => account,
            Ok(None) => return (None, MemberStanding::Unregistered),
            Err(e) => return (None, MemberStanding::ApiError(e.to_string())),
        };
        let standing = match self.api.account(&account.api_key).await {
            Ok(snapshot) => MemberStanding::Registered(snapshot),
            Err(e) => {
                tracing::debug!(member_id = %member, error = %e, "Stored key rejected");
                MemberStanding::ApiError(e.to_string())
            }
        };
        (Some(account), standing)
    }

    /// Run `task` for every item, at most `concurrency` at a time, returning
    /// results sorted by the key `task` reports.
    async fn fan_out<T, R, F, Fut>(&self, items: Vec<T>, task: F) -> Vec<R>
    where
        F: Fn(T) -> Fut,
        Fut: std::future::Future<Output = (MemberId, R)>,
    {
        let mut results: Vec<(MemberId, R)> = stream::iter(items)
            .map(task)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.sort_by_key(|(id, _)| *id);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

fn label(member: &Member, account: Option<&Account>) -> MemberLabel {
    MemberLabel {
        id: member.id,
        display_name: member.display_name.clone(),
        account_name: account.map(|a| a.account_name.clone()),
    }
}

// =============================================================================
// Audit
// =============================================================================

/// An audit together with the server config it was classified against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAudit {
    pub config: ServerConfig,
    pub report: AuditReport,
}

/// Classifies every member of a server. Changes nothing.
pub struct AuditServer {
    roster: Arc<Roster>,
    configs: Arc<ServerConfigOps>,
    worlds: Arc<WorldDirectoryService>,
}

impl AuditServer {
    pub fn new(
        roster: Arc<Roster>,
        configs: Arc<ServerConfigOps>,
        worlds: Arc<WorldDirectoryService>,
    ) -> Self {
        Self {
            roster,
            configs,
            worlds,
        }
    }

    pub async fn execute(&self, server: ServerId) -> Result<ServerAudit, BatchError> {
        let config = self.configs.get(server).await?;
        let worlds = self.worlds.load().await?;
        let members = self.roster.members(server).await?;

        let standings = self
            .roster
            .fan_out(members, |member| async move {
                let (_, standing) = self.roster.standing(member.id).await;
                (member.id, (member, standing))
            })
            .await;

        let mut report = AuditReport::default();
        for (member, standing) in &standings {
            report.record(member, standing, &config, &worlds);
        }

        tracing::info!(
            server_id = %server,
            total = report.total,
            unregistered = report.unregistered.len(),
            api_error = report.api_error.len(),
            "Audit complete"
        );
        Ok(ServerAudit { config, report })
    }
}

// =============================================================================
// Refresh
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub updated: Vec<MemberLabel>,
    pub unchanged: usize,
    pub unregistered: usize,
    pub api_error: Vec<MemberLabel>,
    /// Members whose roles could not be written.
    pub failed: Vec<MemberLabel>,
}

enum RefreshOutcome {
    Updated(MemberLabel),
    Unchanged,
    Unregistered,
    ApiError(MemberLabel),
    Failed(MemberLabel),
}

/// Reconciles every registered member of a server.
pub struct RefreshServer {
    roster: Arc<Roster>,
    reconcile: Arc<ReconcileMember>,
}

impl RefreshServer {
    pub fn new(roster: Arc<Roster>, reconcile: Arc<ReconcileMember>) -> Self {
        Self { roster, reconcile }
    }

    pub async fn execute(&self, server: ServerId) -> Result<RefreshReport, BatchError> {
        let context = self.reconcile.context(server).await?;
        let members = self.roster.members(server).await?;

        let outcomes = self
            .roster
            .fan_out(members, |member| {
                let context = &context;
                async move { (member.id, self.refresh_one(context, &member).await) }
            })
            .await;

        let mut report = RefreshReport::default();
        for outcome in outcomes {
            match outcome {
                RefreshOutcome::Updated(label) => report.updated.push(label),
                RefreshOutcome::Unchanged => report.unchanged += 1,
                RefreshOutcome::Unregistered => report.unregistered += 1,
                RefreshOutcome::ApiError(label) => report.api_error.push(label),
                RefreshOutcome::Failed(label) => report.failed.push(label),
            }
        }

        tracing::info!(
            server_id = %server,
            updated = report.updated.len(),
            unchanged = report.unchanged,
            failed = report.failed.len(),
            "Refresh complete"
        );
        Ok(report)
    }

    async fn refresh_one(&self, context: &ServerContext, member: &Member) -> RefreshOutcome {
        let (account, standing) = self.roster.standing(member.id).await;
        let label = label(member, account.as_ref());
        let snapshot = match standing {
            MemberStanding::Registered(snapshot) => snapshot,
            MemberStanding::Unregistered => return RefreshOutcome::Unregistered,
            MemberStanding::ApiError(_) => return RefreshOutcome::ApiError(label),
        };

        match self.reconcile.apply(context, member, &snapshot).await {
            Ok(plan) if plan.is_noop() => RefreshOutcome::Unchanged,
            Ok(_) => RefreshOutcome::Updated(label),
            Err(e) => {
                tracing::warn!(server_id = %context.server, member_id = %member.id, error = %e, "Refresh failed for member");
                RefreshOutcome::Failed(label)
            }
        }
    }
}

// =============================================================================
// Purge
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Members of the target server whose roles were re-derived.
    pub kept: Vec<MemberLabel>,
    /// Accounts whose user is still in another served server.
    pub elsewhere: usize,
    /// Account names deleted because their user left every served server.
    pub removed: Vec<String>,
    pub api_error: Vec<MemberLabel>,
    /// Accounts that could not be processed; nothing was deleted for them.
    pub failed: Vec<MemberId>,
}

enum PurgeOutcome {
    Kept(MemberLabel),
    Elsewhere,
    Removed(String),
    ApiError(MemberLabel),
    Failed(MemberId),
    /// The account disappeared while the purge ran; not reported.
    Vanished,
}

/// Drops stored accounts of users who left, and reconciles the rest.
pub struct PurgeAccounts {
    roster: Arc<Roster>,
    platform: Arc<dyn ChatPlatformPort>,
    accounts: Arc<dyn AccountRepo>,
    reconcile: Arc<ReconcileMember>,
}

impl PurgeAccounts {
    pub fn new(
        roster: Arc<Roster>,
        platform: Arc<dyn ChatPlatformPort>,
        accounts: Arc<dyn AccountRepo>,
        reconcile: Arc<ReconcileMember>,
    ) -> Self {
        Self {
            roster,
            platform,
            accounts,
            reconcile,
        }
    }

    pub async fn execute(&self, server: ServerId) -> Result<PurgeReport, BatchError> {
        let context = self.reconcile.context(server).await?;
        let others: Vec<ServerId> = self
            .platform
            .servers()
            .await?
            .into_iter()
            .map(|s| s.id)
            .filter(|id| *id != server)
            .collect();
        let ids = self.accounts.list_member_ids().await?;

        let outcomes = self
            .roster
            .fan_out(ids, |id| {
                let context = &context;
                let others = &others;
                async move { (id, self.purge_one(context, others, id).await) }
            })
            .await;

        let mut report = PurgeReport::default();
        for outcome in outcomes {
            match outcome {
                PurgeOutcome::Kept(label) => report.kept.push(label),
                PurgeOutcome::Elsewhere => report.elsewhere += 1,
                PurgeOutcome::Removed(name) => report.removed.push(name),
                PurgeOutcome::ApiError(label) => report.api_error.push(label),
                PurgeOutcome::Failed(id) => report.failed.push(id),
                PurgeOutcome::Vanished => {}
            }
        }

        tracing::info!(
            server_id = %server,
            kept = report.kept.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Purge complete"
        );
        Ok(report)
    }

    async fn purge_one(
        &self,
        context: &ServerContext,
        others: &[ServerId],
        id: MemberId,
    ) -> PurgeOutcome {
        match self.platform.member(context.server, id).await {
            Ok(Some(member)) => self.reconcile_present(context, &member).await,
            Ok(None) => self.drop_if_gone(others, id).await,
            Err(e) => {
                tracing::warn!(server_id = %context.server, member_id = %id, error = %e, "Member lookup failed during purge");
                PurgeOutcome::Failed(id)
            }
        }
    }

    async fn reconcile_present(&self, context: &ServerContext, member: &Member) -> PurgeOutcome {
        let (account, standing) = self.roster.standing(member.id).await;
        let label = label(member, account.as_ref());
        match standing {
            MemberStanding::Registered(snapshot) => {
                match self.reconcile.apply(context, member, &snapshot).await {
                    Ok(_) => PurgeOutcome::Kept(label),
                    Err(e) => {
                        tracing::warn!(member_id = %member.id, error = %e, "Reconcile failed during purge");
                        PurgeOutcome::Failed(member.id)
                    }
                }
            }
            MemberStanding::Unregistered => {
                tracing::debug!(member_id = %member.id, "Account deleted during purge, skipping");
                PurgeOutcome::Vanished
            }
            MemberStanding::ApiError(_) => PurgeOutcome::ApiError(label),
        }
    }

    async fn drop_if_gone(&self, others: &[ServerId], id: MemberId) -> PurgeOutcome {
        for &other in others {
            match self.platform.member(other, id).await {
                Ok(Some(_)) => return PurgeOutcome::Elsewhere,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(server_id = %other, member_id = %id, error = %e, "Membership check failed, keeping account");
                    return PurgeOutcome::Failed(id);
                }
            }
        }

        let name = match self.accounts.get(id).await {
            Ok(account) => account.map(|a| a.account_name).unwrap_or_else(|| id.to_string()),
            Err(_) => id.to_string(),
        };
        match self.accounts.delete(id).await {
            Ok(()) => {
                tracing::info!(member_id = %id, "Removed account of departed user");
                PurgeOutcome::Removed(name)
            }
            Err(e) => {
                tracing::warn!(member_id = %id, error = %e, "Failed to delete account");
                PurgeOutcome::Failed(id)
            }
        }
    }
}
