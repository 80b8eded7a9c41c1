//! Account verification: validate a key against the game API and store it.

use std::sync::Arc;

use gw2link_domain::{Account, AccountSnapshot, ApiKey, DomainError, MemberId, RolePlan, ServerId};

use crate::infrastructure::ports::{AccountRepo, ClockPort, GameApiError, GameApiPort, RepoError};
use crate::use_cases::reconcile::{ReconcileError, ReconcileMember};

/// Reply text for a key the game API refused.
pub const INVALID_KEY_MESSAGE: &str =
    "Couldn't retrieve account information. Check API key or try again later.";

pub struct VerifyAccount {
    api: Arc<dyn GameApiPort>,
    accounts: Arc<dyn AccountRepo>,
    clock: Arc<dyn ClockPort>,
}

impl VerifyAccount {
    pub fn new(
        api: Arc<dyn GameApiPort>,
        accounts: Arc<dyn AccountRepo>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            api,
            accounts,
            clock,
        }
    }

    /// Check the key with a live account call and store it on success.
    ///
    /// Nothing is written unless the game API accepted the key.
    pub async fn verify_and_store(
        &self,
        member: MemberId,
        raw_key: &str,
    ) -> Result<(Account, AccountSnapshot), VerifyError> {
        let key = ApiKey::new(raw_key)?;

        let snapshot = self.api.account(&key).await.map_err(|e| {
            tracing::info!(member_id = %member, key = %key.redacted(), error = %e, "Account lookup failed");
            VerifyError::from_api(e)
        })?;

        let account = Account::new(member, key, &snapshot, self.clock.now());
        self.accounts.save(&account).await?;

        tracing::info!(member_id = %member, account = %snapshot.name, "Account verified");
        Ok((account, snapshot))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Couldn't retrieve account information. Check API key or try again later.")]
    InvalidKey,
    #[error("Game API unavailable: {0}")]
    UpstreamUnavailable(#[source] GameApiError),
    #[error("Invalid API key: {0}")]
    Validation(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl VerifyError {
    /// An HTTP answer of any non-success status means the key was refused;
    /// no answer at all means the API is down.
    fn from_api(error: GameApiError) -> Self {
        if error.is_status() {
            Self::InvalidKey
        } else {
            Self::UpstreamUnavailable(error)
        }
    }
}

// =============================================================================
// Link: verify, then reconcile
// =============================================================================

/// Result of linking an account, with one reconciliation per server.
#[derive(Debug)]
pub struct LinkOutcome {
    pub account: Account,
    pub snapshot: AccountSnapshot,
    /// `Ok(None)` when the user is not a member of that server.
    pub servers: Vec<(ServerId, Result<Option<RolePlan>, ReconcileError>)>,
}

impl LinkOutcome {
    /// Plans that were applied, skipping servers the user is not in.
    pub fn applied(&self) -> impl Iterator<Item = (ServerId, &RolePlan)> {
        self.servers
            .iter()
            .filter_map(|(server, result)| match result {
                Ok(Some(plan)) => Some((*server, plan)),
                _ => None,
            })
    }

    pub fn failures(&self) -> impl Iterator<Item = (ServerId, &ReconcileError)> {
        self.servers
            .iter()
            .filter_map(|(server, result)| result.as_ref().err().map(|e| (*server, e)))
    }
}

/// The `key` command: store the account, then bring the member's roles in
/// line on each requested server.
pub struct LinkAccount {
    verify: Arc<VerifyAccount>,
    reconcile: Arc<ReconcileMember>,
}

impl LinkAccount {
    pub fn new(verify: Arc<VerifyAccount>, reconcile: Arc<ReconcileMember>) -> Self {
        Self { verify, reconcile }
    }

    pub async fn execute(
        &self,
        member: MemberId,
        raw_key: &str,
        servers: &[ServerId],
    ) -> Result<LinkOutcome, VerifyError> {
        let (account, snapshot) = self.verify.verify_and_store(member, raw_key).await?;

        let mut results = Vec::with_capacity(servers.len());
        for &server in servers {
            let result = self.reconcile.execute(server, member, &snapshot).await;
            if let Err(e) = &result {
                tracing::warn!(server_id = %server, member_id = %member, error = %e, "Reconcile after verification failed");
            }
            results.push((server, result));
        }

        Ok(LinkOutcome {
            account,
            snapshot,
            servers: results,
        })
    }
}
