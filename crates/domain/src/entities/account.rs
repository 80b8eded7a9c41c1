use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{GuildId, MemberId, WorldId};
use crate::value_objects::ApiKey;

/// A platform user's stored game API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub member_id: MemberId,
    pub api_key: ApiKey,
    /// Game account name at verification time, for reports.
    pub account_name: String,
    pub verified_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        member_id: MemberId,
        api_key: ApiKey,
        snapshot: &AccountSnapshot,
        verified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            member_id,
            api_key,
            account_name: snapshot.name.clone(),
            verified_at,
        }
    }
}

/// Live game-account data, fetched with a stored key. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub name: String,
    pub world: WorldId,
    pub guilds: BTreeSet<GuildId>,
}

impl AccountSnapshot {
    pub fn is_in_guild(&self, guild: &GuildId) -> bool {
        self.guilds.contains(guild)
    }
}
