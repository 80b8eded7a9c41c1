//! Typed records over the key-value store.
//!
//! Each record is stored as a JSON envelope carrying the schema version:
//! `{"schema": 1, "record": {...}}`. Blobs with any other version are
//! rejected rather than guessed at.

use std::sync::Arc;

use async_trait::async_trait;
use gw2link_domain::{Account, MemberId, ServerConfig, ServerId, WorldDirectory};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::infrastructure::ports::{
    AccountRepo, KvStore, RepoError, ServerConfigRepo, WorldCacheRepo,
};

pub const SCHEMA_VERSION: u32 = 1;

const WORLDS_KEY: &str = "worlds";
const ACCOUNT_PREFIX: &str = "account_";
const SERVER_PREFIX: &str = "server_";

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema: u32,
    record: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    schema: u32,
    record: T,
}

fn encode<T: Serialize>(record: &T) -> Result<String, RepoError> {
    serde_json::to_string(&EnvelopeRef {
        schema: SCHEMA_VERSION,
        record,
    })
    .map_err(RepoError::serialization)
}

fn decode<T: DeserializeOwned>(key: &str, blob: &str) -> Result<T, RepoError> {
    let envelope: Envelope<T> = serde_json::from_str(blob)
        .map_err(|e| RepoError::serialization(format!("{key}: {e}")))?;
    if envelope.schema != SCHEMA_VERSION {
        return Err(RepoError::serialization(format!(
            "{key}: schema version {} is not supported (expected {SCHEMA_VERSION})",
            envelope.schema
        )));
    }
    Ok(envelope.record)
}

async fn read<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>, RepoError> {
    match store.get(key).await? {
        Some(blob) => decode(key, &blob).map(Some),
        None => Ok(None),
    }
}

fn account_key(member: MemberId) -> String {
    format!("{ACCOUNT_PREFIX}{member}")
}

fn server_key(server: ServerId) -> String {
    format!("{SERVER_PREFIX}{server}")
}

// =============================================================================
// Accounts
// =============================================================================

pub struct KvAccountRepo {
    store: Arc<dyn KvStore>,
}

impl KvAccountRepo {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AccountRepo for KvAccountRepo {
    async fn get(&self, member: MemberId) -> Result<Option<Account>, RepoError> {
        read(self.store.as_ref(), &account_key(member)).await
    }

    async fn save(&self, account: &Account) -> Result<(), RepoError> {
        self.store
            .set(&account_key(account.member_id), &encode(account)?)
            .await
    }

    async fn delete(&self, member: MemberId) -> Result<(), RepoError> {
        self.store.del(&account_key(member)).await
    }

    async fn list_member_ids(&self) -> Result<Vec<MemberId>, RepoError> {
        let keys = self.store.keys(ACCOUNT_PREFIX).await?;
        let mut ids = Vec::with_capacity(keys.len());
        for key in keys {
            match key[ACCOUNT_PREFIX.len()..].parse::<MemberId>() {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(key = %key, error = %e, "Skipping malformed account key"),
            }
        }
        Ok(ids)
    }
}

// =============================================================================
// Server configuration
// =============================================================================

pub struct KvServerConfigRepo {
    store: Arc<dyn KvStore>,
}

impl KvServerConfigRepo {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ServerConfigRepo for KvServerConfigRepo {
    async fn get(&self, server: ServerId) -> Result<Option<ServerConfig>, RepoError> {
        read(self.store.as_ref(), &server_key(server)).await
    }

    async fn save(&self, server: ServerId, config: &ServerConfig) -> Result<(), RepoError> {
        self.store.set(&server_key(server), &encode(config)?).await
    }
}

// =============================================================================
// World directory snapshot
// =============================================================================

pub struct KvWorldCache {
    store: Arc<dyn KvStore>,
}

impl KvWorldCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WorldCacheRepo for KvWorldCache {
    async fn load(&self) -> Result<Option<WorldDirectory>, RepoError> {
        read(self.store.as_ref(), WORLDS_KEY).await
    }

    async fn store(&self, worlds: &WorldDirectory) -> Result<(), RepoError> {
        self.store.set(WORLDS_KEY, &encode(worlds)?).await
    }
}
