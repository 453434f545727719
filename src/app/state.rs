//! Application state shared across tasks

use std::sync::Arc;

use crate::config::Config;
use crate::game::{ActorRegistry, FlatWorld, World, WorldHandle, WorldSettings};
use crate::store::{PlayerStore, StoreError};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub player_store: PlayerStore,
    pub actors: Arc<ActorRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, StoreError> {
        let config = Arc::new(config);

        // Initialize stores
        let player_store = PlayerStore::open(&config.world_dir)?;

        // Initialize actor registry
        let actors = Arc::new(ActorRegistry::new());

        Ok(Self {
            config,
            player_store,
            actors,
        })
    }

    /// Build the world task over a flat map
    pub fn build_world(&self) -> (World, WorldHandle) {
        World::new(
            WorldSettings::from_config(&self.config),
            self.player_store.clone(),
            self.actors.clone(),
            Box::new(FlatWorld::default()),
        )
    }
}
