//! Player files under `<world>/players/`

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::game::actor::ActorRegistry;
use crate::player::{Player, PlayerDataError, PlayerName};

/// One text record per player, named after the player
#[derive(Debug, Clone)]
pub struct PlayerStore {
    players_dir: PathBuf,
    /// Writers of the same file take turns; shared between clones
    write_locks: Arc<DashMap<PlayerName, Arc<Mutex<()>>>>,
}

impl PlayerStore {
    /// Open (creating if needed) the players directory of a world
    pub fn open(world_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let players_dir = world_dir.as_ref().join("players");
        fs::create_dir_all(&players_dir)?;
        Ok(Self {
            players_dir,
            write_locks: Arc::new(DashMap::new()),
        })
    }

    pub fn players_dir(&self) -> &Path {
        &self.players_dir
    }

    /// Names are validated to a file-name-safe character set, so they can
    /// be used directly.
    pub fn path_for(&self, name: &PlayerName) -> PathBuf {
        self.players_dir.join(name.as_str())
    }

    pub fn exists(&self, name: &PlayerName) -> bool {
        self.path_for(name).is_file()
    }

    /// Restore `player` from its file, moving its actor along. On error the
    /// player is unchanged.
    pub fn load_into(&self, player: &mut Player, actors: &ActorRegistry) -> Result<(), StoreError> {
        let name = player.name().clone();
        let path = self.path_for(&name);

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name));
            }
            Err(e) => return Err(e.into()),
        };

        player.deserialize(&mut BufReader::new(file), &name, actors)?;
        debug!(player = %name, path = %path.display(), "Loaded player");
        Ok(())
    }

    /// Write the player's file, replacing the previous one atomically
    pub fn save(&self, player: &Player) -> Result<(), StoreError> {
        let mut record = Vec::new();
        player.serialize(&mut record)?;

        let lock = self.write_lock(player.name());
        let _turn = lock.lock();

        let path = self.path_for(player.name());
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&record)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        debug!(player = %player.name(), path = %path.display(), "Saved player");
        Ok(())
    }

    /// Save every player, logging failures. Returns how many were saved.
    pub fn save_all(&self, players: &[Arc<Mutex<Player>>]) -> usize {
        let mut saved = 0;
        for player in players {
            if self.save_logged(&player.lock()) {
                saved += 1;
            }
        }
        info!(saved, total = players.len(), "Saved players");
        saved
    }

    /// Like [`PlayerStore::save_all`], but only for players still held by
    /// someone else. A player dropped from the world has already been saved
    /// on its way out and may have been reloaded since.
    pub fn save_live(&self, players: &[Weak<Mutex<Player>>]) -> usize {
        let mut saved = 0;
        for player in players {
            let Some(player) = player.upgrade() else {
                continue;
            };
            let guard = player.lock();
            if Arc::strong_count(&player) < 2 {
                continue;
            }
            if self.save_logged(&guard) {
                saved += 1;
            }
        }
        info!(saved, total = players.len(), "Autosaved players");
        saved
    }

    fn save_logged(&self, player: &Player) -> bool {
        match self.save(player) {
            Ok(()) => true,
            Err(e) => {
                error!(player = %player.name(), error = %e, "Failed to save player");
                false
            }
        }
    }

    fn write_lock(&self, name: &PlayerName) -> Arc<Mutex<()>> {
        self.write_locks.entry(name.clone()).or_default().clone()
    }

    /// Names of all stored players, skipping anything that is not a valid
    /// player file
    pub fn list_names(&self) -> Result<Vec<PlayerName>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.players_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Ok(name) = PlayerName::new(file_name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Player store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No saved data for player {0}")]
    NotFound(PlayerName),

    #[error("Player data error: {0}")]
    Data(#[from] PlayerDataError),

    #[error("Player store I/O error: {0}")]
    Io(#[from] std::io::Error),
}
