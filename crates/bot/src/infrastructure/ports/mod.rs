//! Port traits for infrastructure boundaries.
//!
//! These are the only abstractions in the bot. Everything else is concrete types.
//! Ports exist for:
//! - Storage (SQLite today, anything with get/set/del/keys tomorrow)
//! - The game API
//! - The chat platform
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Storage Ports
// =============================================================================
pub use repos::{AccountRepo, KvStore, ServerConfigRepo, WorldCacheRepo};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{ChatPlatformPort, GameApiPort, Permission, ServerSummary};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{MockAccountRepo, MockServerConfigRepo, MockWorldCacheRepo};

#[cfg(test)]
pub use external::{MockChatPlatformPort, MockGameApiPort};

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{GameApiError, PlatformError, RepoError};
