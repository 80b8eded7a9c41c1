//! World Directory loading and world role provisioning.

use std::sync::Arc;

use gw2link_domain::{RoleDirectory, RoleId, ServerId, World, WorldDirectory};
use tokio::sync::OnceCell;

use crate::infrastructure::ports::{
    ChatPlatformPort, GameApiError, GameApiPort, PlatformError, RepoError, WorldCacheRepo,
};

// =============================================================================
// World Directory
// =============================================================================

/// Two-level world cache: the process-local copy is filled once from the
/// durable snapshot, which is itself filled from the game API on a miss.
pub struct WorldDirectoryService {
    cache: Arc<dyn WorldCacheRepo>,
    api: Arc<dyn GameApiPort>,
    loaded: OnceCell<Arc<WorldDirectory>>,
}

impl WorldDirectoryService {
    pub fn new(cache: Arc<dyn WorldCacheRepo>, api: Arc<dyn GameApiPort>) -> Self {
        Self {
            cache,
            api,
            loaded: OnceCell::new(),
        }
    }

    /// The complete directory. Only the first successful call does any I/O.
    pub async fn load(&self) -> Result<Arc<WorldDirectory>, WorldDirectoryError> {
        self.loaded
            .get_or_try_init(|| self.fetch())
            .await
            .map(Arc::clone)
    }

    async fn fetch(&self) -> Result<Arc<WorldDirectory>, WorldDirectoryError> {
        match self.cache.load().await {
            Ok(Some(cached)) if !cached.is_empty() => {
                tracing::debug!(worlds = cached.len(), "World directory loaded from store");
                return Ok(Arc::new(cached));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Stored world directory unreadable, refetching");
            }
        }

        let worlds = self
            .api
            .worlds()
            .await
            .map_err(WorldDirectoryError::UpstreamUnavailable)?;
        let directory = WorldDirectory::from_worlds(worlds);
        self.cache.store(&directory).await?;

        tracing::info!(worlds = directory.len(), "World directory fetched from game API");
        Ok(Arc::new(directory))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorldDirectoryError {
    #[error("Couldn't retrieve world info from API: {0}")]
    UpstreamUnavailable(#[source] GameApiError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

// =============================================================================
// World roles
// =============================================================================

/// A known world and its role on one server, if provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldRoleStatus {
    pub world: World,
    pub role: Option<RoleId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldRoleChange {
    Created { world: World, role: RoleId },
    Removed { world: World, role: RoleId },
    /// Nothing to do; the role was already in the requested state.
    Unchanged { world: World },
}

/// Creates and deletes the managed per-world roles on a server.
pub struct WorldRoles {
    worlds: Arc<WorldDirectoryService>,
    platform: Arc<dyn ChatPlatformPort>,
}

impl WorldRoles {
    pub fn new(worlds: Arc<WorldDirectoryService>, platform: Arc<dyn ChatPlatformPort>) -> Self {
        Self { worlds, platform }
    }

    pub async fn list(&self, server: ServerId) -> Result<Vec<WorldRoleStatus>, WorldRoleError> {
        let worlds = self.worlds.load().await?;
        let roles = RoleDirectory::from_roles(self.platform.roles(server).await?);

        Ok(worlds
            .iter()
            .map(|(id, name)| WorldRoleStatus {
                world: World {
                    id,
                    name: name.to_string(),
                },
                role: roles.resolve(name),
            })
            .collect())
    }

    pub async fn add(&self, server: ServerId, name: &str) -> Result<WorldRoleChange, WorldRoleError> {
        let world = self.known_world(name).await?;
        let roles = RoleDirectory::from_roles(self.platform.roles(server).await?);
        if roles.contains(&world.name) {
            return Ok(WorldRoleChange::Unchanged { world });
        }

        let role = self.platform.create_role(server, &world.name).await?;
        tracing::info!(server_id = %server, role_id = %role, world = %world.name, "Created world role");
        Ok(WorldRoleChange::Created { world, role })
    }

    pub async fn remove(
        &self,
        server: ServerId,
        name: &str,
    ) -> Result<WorldRoleChange, WorldRoleError> {
        let world = self.known_world(name).await?;
        let roles = RoleDirectory::from_roles(self.platform.roles(server).await?);
        let Some(role) = roles.resolve(&world.name) else {
            return Ok(WorldRoleChange::Unchanged { world });
        };

        self.platform.delete_role(server, role).await?;
        tracing::info!(server_id = %server, role_id = %role, world = %world.name, "Deleted world role");
        Ok(WorldRoleChange::Removed { world, role })
    }

    async fn known_world(&self, name: &str) -> Result<World, WorldRoleError> {
        self.worlds
            .load()
            .await?
            .find_by_name(name)
            .ok_or_else(|| WorldRoleError::UnknownWorld(name.trim().to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorldRoleError {
    #[error("Unknown world: {0}")]
    UnknownWorld(String),
    #[error(transparent)]
    Worlds(#[from] WorldDirectoryError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}
