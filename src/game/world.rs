//! World state and authoritative tick loop

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::net::protocol::{ClientMsg, ServerMsg};
use crate::player::{MovementSettings, Player, PlayerControl, PlayerName, BS};
use crate::store::{PlayerStore, StoreError};
use crate::util::time::{tick_delta, unix_millis, Timer};

use super::actor::ActorRegistry;
use super::collision::CollisionWorld;
use super::physics::MovementIntegrator;
use super::snapshot::{SnapshotBuilder, SyncTolerance};
use super::PlayerInput;

/// Largest distance a player may move in one collision step
pub const POSITION_MAX_INCREMENT: f32 = 0.1 * BS;

/// Upper bound on collision steps per tick
const MAX_SUBSTEPS: u32 = 32;

/// Knobs the world needs from the configuration
#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub movement: MovementSettings,
    pub sync_tolerance: SyncTolerance,
    pub fast_move: bool,
    /// Spawn disc radius in nodes
    pub spawn_radius: f32,
    pub seed: u64,
    pub simulation_tps: u32,
    /// Ticks between state-update checks
    pub snapshot_interval: u32,
    /// `None` disables autosave
    pub autosave_interval: Option<Duration>,
}

impl WorldSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            movement: config.movement,
            sync_tolerance: config.sync_tolerance,
            fast_move: config.fast_move,
            spawn_radius: config.spawn_radius,
            seed: config.world_seed,
            simulation_tps: config.simulation_tps,
            snapshot_interval: config.snapshot_interval(),
            autosave_interval: (config.autosave_interval_secs > 0)
                .then(|| Duration::from_secs(config.autosave_interval_secs)),
        }
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            movement: MovementSettings::default(),
            sync_tolerance: SyncTolerance::default(),
            fast_move: false,
            spawn_radius: 5.0,
            seed: 0,
            simulation_tps: 30,
            snapshot_interval: 3,
            autosave_interval: Some(Duration::from_secs(60)),
        }
    }
}

/// Handle to a running world
#[derive(Clone)]
pub struct WorldHandle {
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub snapshot_tx: broadcast::Sender<ServerMsg>,
    pub player_count: Arc<AtomicUsize>,
}

impl WorldHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.snapshot_tx.subscribe()
    }

    /// Queue a client message for the next tick
    pub async fn send(&self, name: PlayerName, msg: ClientMsg) -> Result<(), WorldError> {
        self.input_tx
            .send(PlayerInput {
                name,
                msg,
                received_at: unix_millis(),
            })
            .await
            .map_err(|_| WorldError::Closed)
    }

    /// Non-blocking variant of [`WorldHandle::send`]
    pub fn try_send(&self, name: PlayerName, msg: ClientMsg) -> Result<(), WorldError> {
        self.input_tx
            .try_send(PlayerInput {
                name,
                msg,
                received_at: unix_millis(),
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => WorldError::Backlogged,
                mpsc::error::TrySendError::Closed(_) => WorldError::Closed,
            })
    }
}

/// The authoritative world
pub struct World {
    tick: u64,
    settings: WorldSettings,
    players: BTreeMap<PlayerName, Arc<Mutex<Player>>>,
    actors: Arc<ActorRegistry>,
    map: Box<dyn CollisionWorld + Send + Sync>,
    store: PlayerStore,
    rng: ChaCha8Rng,
    input_rx: mpsc::Receiver<PlayerInput>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<AtomicUsize>,
}

impl World {
    pub fn new(
        settings: WorldSettings,
        store: PlayerStore,
        actors: Arc<ActorRegistry>,
        map: Box<dyn CollisionWorld + Send + Sync>,
    ) -> (Self, WorldHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (snapshot_tx, _) = broadcast::channel(256);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = WorldHandle {
            input_tx,
            snapshot_tx: snapshot_tx.clone(),
            player_count: player_count.clone(),
        };

        let world = Self {
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            snapshot_builder: SnapshotBuilder::new(settings.snapshot_interval),
            settings,
            players: BTreeMap::new(),
            actors,
            map,
            store,
            input_rx,
            snapshot_tx,
            player_count,
        };

        (world, handle)
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn player(&self, name: &PlayerName) -> Option<Arc<Mutex<Player>>> {
        self.players.get(name).cloned()
    }

    pub fn players(&self) -> Vec<Arc<Mutex<Player>>> {
        self.players.values().cloned().collect()
    }

    /// Save every connected player now
    pub fn save_all(&self) -> usize {
        self.store.save_all(&self.players())
    }

    /// Run the authoritative tick loop until `shutdown` resolves, then save
    /// everyone.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        info!(
            tps = self.settings.simulation_tps,
            snapshot_interval = self.settings.snapshot_interval,
            "World started"
        );

        let tick_duration = Duration::from_micros(1_000_000 / self.settings.simulation_tps.max(1) as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut autosave_timer = Timer::new();
        let mut autosave: Option<JoinHandle<usize>> = None;

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {}
                _ = &mut shutdown => break,
            }

            self.step();

            let Some(every) = self.settings.autosave_interval else {
                continue;
            };
            if autosave_timer.elapsed_ms() < every.as_millis() as u64 {
                continue;
            }
            if autosave.as_ref().is_some_and(|task| !task.is_finished()) {
                warn!("Previous autosave still running, skipping");
                continue;
            }
            autosave_timer.reset();

            let store = self.store.clone();
            let players: Vec<_> = self.players.values().map(Arc::downgrade).collect();
            autosave = Some(tokio::task::spawn_blocking(move || store.save_live(&players)));
        }

        if let Some(task) = autosave {
            if let Err(e) = task.await {
                error!(error = %e, "Autosave task failed");
            }
        }

        let saved = self.save_all();
        info!(tick = self.tick, saved, "World stopped");
    }

    /// Drain pending input, simulate one tick and broadcast any changes
    pub fn step(&mut self) {
        self.process_inputs();
        self.run_tick();

        if self.snapshot_builder.should_send() {
            for player in self.players.values() {
                let mut player = player.lock();
                if let Some(update) = self.snapshot_builder.build(self.tick, &mut player) {
                    let _ = self.snapshot_tx.send(update);
                }
            }
        }
    }

    /// Process all pending inputs from players
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            match input.msg {
                ClientMsg::Join { peer_id } => self.handle_join(input.name, peer_id),
                ClientMsg::Control { control } => self.handle_control(&input.name, control),
                ClientMsg::Leave => self.handle_leave(&input.name),
            }
        }
    }

    /// Handle player join request
    fn handle_join(&mut self, name: PlayerName, peer_id: u16) {
        if self.players.contains_key(&name) {
            warn!(player = %name, "Player already in world");
            let _ = self.snapshot_tx.send(ServerMsg::Error {
                peer_id: Some(peer_id),
                code: "already_joined".to_string(),
                message: format!("{name} is already in the world"),
            });
            return;
        }

        let mut player = Player::new_remote(name.clone(), self.settings.movement)
            .with_sync_tolerance(self.settings.sync_tolerance);
        player.peer_id = peer_id;

        match self.store.load_into(&mut player, &self.actors) {
            Ok(()) => {
                // Keep the stored look direction until the client says otherwise
                player.control.pitch = player.pitch();
                player.control.yaw = player.yaw();
            }
            Err(StoreError::NotFound(_)) => {
                let spawn = self.generate_spawn_position();
                player.place(spawn);
                debug!(player = %name, ?spawn, "New player");
            }
            Err(e) => {
                // Refuse rather than overwrite the stored record on next save
                error!(player = %name, error = %e, "Failed to load player");
                let _ = self.snapshot_tx.send(ServerMsg::Error {
                    peer_id: Some(peer_id),
                    code: "player_data".to_string(),
                    message: format!("Could not load saved data for {name}"),
                });
                return;
            }
        }

        let actor = self.actors.spawn(name.clone(), player.position());
        player.set_actor(Some(actor));

        self.players.insert(name.clone(), Arc::new(Mutex::new(player)));
        self.player_count.store(self.players.len(), Ordering::Relaxed);

        let _ = self.snapshot_tx.send(ServerMsg::PlayerJoined { name: name.clone() });
        self.snapshot_builder.force_next();

        info!(
            player = %name,
            peer_id,
            actor = %actor,
            player_count = self.players.len(),
            "Player joined world"
        );
    }

    /// Handle player input
    fn handle_control(&mut self, name: &PlayerName, control: PlayerControl) {
        match self.players.get(name) {
            Some(player) => player.lock().control = control,
            None => debug!(player = %name, "Control from player not in world"),
        }
    }

    /// Handle player leave
    fn handle_leave(&mut self, name: &PlayerName) {
        let Some(player) = self.players.remove(name) else {
            return;
        };
        self.player_count.store(self.players.len(), Ordering::Relaxed);

        let mut player = player.lock();
        if let Err(e) = self.store.save(&player) {
            error!(player = %name, error = %e, "Failed to save leaving player");
        }
        if let Some(actor) = player.actor_id() {
            self.actors.remove(actor);
            player.set_actor(None);
        }

        let _ = self.snapshot_tx.send(ServerMsg::PlayerLeft {
            name: name.clone(),
            reason: "disconnected".to_string(),
        });

        info!(player = %name, "Player left world");
    }

    /// Run a single simulation tick
    fn run_tick(&mut self) {
        self.tick += 1;
        let dtime = tick_delta(self.settings.simulation_tps);

        for player in self.players.values() {
            let mut player = player.lock();
            let control = player.control;

            if MovementIntegrator::apply_control(
                &mut player.state,
                &control,
                self.settings.fast_move,
                dtime,
            ) {
                debug!(player = %player.name(), tick = self.tick, "Jump");
            }

            // Split the tick so no single step moves further than
            // POSITION_MAX_INCREMENT
            let mut remaining = dtime;
            let mut substeps = 0;
            while remaining > 0.0 && substeps < MAX_SUBSTEPS {
                let speed = player.velocity().length();
                let step = if speed > 0.0 {
                    (POSITION_MAX_INCREMENT / speed)
                        .max(dtime / MAX_SUBSTEPS as f32)
                        .min(remaining)
                } else {
                    remaining
                };

                MovementIntegrator::apply_environment(&mut player.state, step);
                player.move_step(step, &*self.map, POSITION_MAX_INCREMENT);

                remaining -= step;
                substeps += 1;
            }

            player.sync_actor(&self.actors);
        }
    }

    /// Random point on the spawn disc around the origin
    fn generate_spawn_position(&mut self) -> Vec3 {
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let radius = self.settings.spawn_radius.max(0.0) * BS;
        let distance = if radius > 0.0 {
            self.rng.gen_range(0.0..radius)
        } else {
            0.0
        };
        Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance)
    }
}

/// Errors talking to a world
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("World has shut down")]
    Closed,

    #[error("World input queue is full")]
    Backlogged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use crate::game::collision::FlatWorld;
    use uuid::Uuid;

    fn temp_world() -> PathBuf {
        std::env::temp_dir().join(format!("world-test-{}", Uuid::new_v4()))
    }

    fn name(raw: &str) -> PlayerName {
        PlayerName::new(raw).unwrap()
    }

    fn world(dir: &PathBuf) -> (World, WorldHandle) {
        let settings = WorldSettings {
            snapshot_interval: 1,
            ..WorldSettings::default()
        };
        World::new(
            settings,
            PlayerStore::open(dir).unwrap(),
            Arc::new(ActorRegistry::new()),
            Box::new(FlatWorld::default()),
        )
    }

    #[test]
    fn join_spawns_actor_and_announces() {
        let dir = temp_world();
        let (mut world, handle) = world(&dir);
        let mut rx = handle.subscribe();

        handle.try_send(name("alice"), ClientMsg::Join { peer_id: 7 }).unwrap();
        world.step();

        assert_eq!(handle.player_count(), 1);
        let player = world.player(&name("alice")).unwrap();
        let player = player.lock();
        assert_eq!(player.peer_id, 7);
        let actor = player.actor_id().unwrap();
        assert_eq!(world.actors.base_position(actor), Some(player.position()));

        assert!(matches!(rx.try_recv(), Ok(ServerMsg::PlayerJoined { .. })));
        assert!(matches!(rx.try_recv(), Ok(ServerMsg::PlayerState { .. })));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn idle_player_is_broadcast_once() {
        let dir = temp_world();
        let (mut world, handle) = world(&dir);
        handle.try_send(name("bob"), ClientMsg::Join { peer_id: 1 }).unwrap();
        world.step();

        // Let the player settle on the floor
        for _ in 0..5 {
            world.step();
        }
        let mut rx = handle.subscribe();
        for _ in 0..5 {
            world.step();
        }
        assert!(rx.try_recv().is_err());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn leave_saves_and_removes_actor() {
        let dir = temp_world();
        let (mut world, handle) = world(&dir);
        handle.try_send(name("carol"), ClientMsg::Join { peer_id: 1 }).unwrap();
        world.step();
        handle.try_send(name("carol"), ClientMsg::Leave).unwrap();
        world.step();

        assert_eq!(handle.player_count(), 0);
        assert!(world.actors.is_empty());
        assert!(world.store.exists(&name("carol")));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn corrupt_record_refuses_join() {
        let dir = temp_world();
        let (mut world, handle) = world(&dir);
        fs::write(world.store.path_for(&name("dave")), "name = dave\n").unwrap();
        let mut rx = handle.subscribe();

        handle.try_send(name("dave"), ClientMsg::Join { peer_id: 1 }).unwrap();
        world.step();

        assert!(world.player(&name("dave")).is_none());
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMsg::Error { peer_id: Some(1), .. })
        ));
        // Untouched on disk
        assert_eq!(
            fs::read_to_string(world.store.path_for(&name("dave"))).unwrap(),
            "name = dave\n"
        );

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn walking_moves_forward() {
        let dir = temp_world();
        let (mut world, handle) = world(&dir);
        handle.try_send(name("erin"), ClientMsg::Join { peer_id: 1 }).unwrap();
        world.step();
        let start = world.player(&name("erin")).unwrap().lock().position();

        let control = PlayerControl {
            up: true,
            ..PlayerControl::default()
        };
        handle.try_send(name("erin"), ClientMsg::Control { control }).unwrap();
        for _ in 0..30 {
            world.step();
        }

        let end = world.player(&name("erin")).unwrap().lock().position();
        // yaw 0 faces +Z
        assert!(end.z > start.z + BS);
        assert!((end.x - start.x).abs() < 1e-3);

        fs::remove_dir_all(dir).unwrap();
    }
}
