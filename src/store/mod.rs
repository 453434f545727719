//! Persistent storage for player data

pub mod players;

pub use players::{PlayerStore, StoreError};
