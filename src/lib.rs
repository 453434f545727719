//! Voxel Player Server - authoritative player state for a voxel world
//!
//! Player identity, movement physics, change tracking and the text record
//! format players are persisted in, driven by a fixed-rate world loop.

pub mod app;
pub mod config;
pub mod game;
pub mod inventory;
pub mod net;
pub mod player;
pub mod store;
pub mod util;
