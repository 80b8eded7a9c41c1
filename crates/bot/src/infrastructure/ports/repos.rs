//! Storage port traits.

use async_trait::async_trait;
use gw2link_domain::{Account, MemberId, ServerConfig, ServerId, WorldDirectory};

use super::error::RepoError;

// =============================================================================
// Durable key-value store
// =============================================================================

/// Raw string-keyed blob store. Last write wins; no transactions.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, RepoError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), RepoError>;
    async fn del(&self, key: &str) -> Result<(), RepoError>;
    /// Every key starting with `prefix`, sorted.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, RepoError>;
}

// =============================================================================
// Typed repositories (one per record type)
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepo: Send + Sync {
    async fn get(&self, member: MemberId) -> Result<Option<Account>, RepoError>;
    async fn save(&self, account: &Account) -> Result<(), RepoError>;
    async fn delete(&self, member: MemberId) -> Result<(), RepoError>;
    async fn list_member_ids(&self) -> Result<Vec<MemberId>, RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerConfigRepo: Send + Sync {
    async fn get(&self, server: ServerId) -> Result<Option<ServerConfig>, RepoError>;
    async fn save(&self, server: ServerId, config: &ServerConfig) -> Result<(), RepoError>;
}

/// Durable snapshot of the world directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorldCacheRepo: Send + Sync {
    async fn load(&self) -> Result<Option<WorldDirectory>, RepoError>;
    async fn store(&self, worlds: &WorldDirectory) -> Result<(), RepoError>;
}
