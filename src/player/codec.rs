//! Persistent player record
//!
//! The record is a block of `key = value` lines closed by a `PlayerArgsEnd`
//! line, followed by the inventory block:
//!
//! ```text
//! version = 1
//! name = celeron55
//! position = (12.5,-3,100)
//! pitch = 0
//! yaw = 270
//! hp = 20
//! breath = 11
//! PlayerArgsEnd
//! List main 32
//! ...
//! EndInventory
//! ```
//!
//! There is no length prefix: readers rely on the terminator lines, so no
//! field may contain a line break. Names are restricted to a safe character
//! set and item names are checked before anything is written.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use glam::Vec3;

use super::kinematics::{PLAYER_MAX_BREATH, PLAYER_MAX_HP};
use super::{Player, PlayerName};
use crate::game::actor::ActorRegistry;
use crate::inventory::{Inventory, InventoryError};

pub const FORMAT_VERSION: u32 = 1;
pub const PLAYER_ARGS_END: &str = "PlayerArgsEnd";

/// Everything read from a record, applied to the player only once the whole
/// record decoded.
struct PlayerRecord {
    position: Vec3,
    pitch: f32,
    yaw: f32,
    hp: Option<u16>,
    breath: Option<u16>,
    inventory: Inventory,
}

impl Player {
    /// Write the player record.
    ///
    /// The record is assembled in memory first, so on error nothing has been
    /// written to `sink`.
    pub fn serialize<W: Write>(&self, sink: &mut W) -> Result<(), PlayerDataError> {
        let mut out = Vec::with_capacity(2048);
        let position = self.position();

        writeln!(out, "version = {FORMAT_VERSION}")?;
        writeln!(out, "name = {}", self.name())?;
        writeln!(out, "position = ({},{},{})", position.x, position.y, position.z)?;
        writeln!(out, "pitch = {}", self.pitch())?;
        writeln!(out, "yaw = {}", self.yaw())?;
        writeln!(out, "hp = {}", self.hp())?;
        writeln!(out, "breath = {}", self.breath())?;
        writeln!(out, "{PLAYER_ARGS_END}")?;
        self.inventory.serialize(&mut out)?;

        sink.write_all(&out)?;
        Ok(())
    }

    /// Read a player record written by [`Player::serialize`].
    ///
    /// `expected_name` is the name the caller is loading (typically taken
    /// from the file name); a record for anyone else is refused. `hp` and
    /// `breath` are optional and keep their current values when absent. The
    /// loaded position is pushed to the player's actor, if it has one. On
    /// any error the player is left untouched.
    pub fn deserialize<R: BufRead>(
        &mut self,
        source: &mut R,
        expected_name: &PlayerName,
        actors: &ActorRegistry,
    ) -> Result<(), PlayerDataError> {
        let args = read_args(source)?;
        let record = PlayerRecord::from_args(&args, expected_name, source)?;

        self.set_pitch(record.pitch);
        self.set_yaw(record.yaw);
        self.set_position(record.position, actors);
        if let Some(hp) = record.hp {
            self.set_hp(hp);
        }
        if let Some(breath) = record.breath {
            self.set_breath(breath);
        }
        self.inventory = record.inventory;

        Ok(())
    }
}

impl PlayerRecord {
    fn from_args<R: BufRead>(
        args: &HashMap<String, String>,
        expected_name: &PlayerName,
        source: &mut R,
    ) -> Result<Self, PlayerDataError> {
        if let Some(raw) = args.get("version") {
            raw.parse::<u32>().map_err(|e| PlayerDataError::Parse {
                field: "version",
                reason: e.to_string(),
            })?;
        }

        let name = required(args, "name")?;
        if name != expected_name.as_str() {
            return Err(PlayerDataError::IdentityMismatch {
                expected: expected_name.to_string(),
                found: name.to_string(),
            });
        }

        let pitch = parse_f32("pitch", required(args, "pitch")?)?;
        let yaw = parse_f32("yaw", required(args, "yaw")?)?;
        let position = parse_v3f("position", required(args, "position")?)?;
        let hp = optional_counter(args, "hp", PLAYER_MAX_HP)?;
        let breath = optional_counter(args, "breath", PLAYER_MAX_BREATH)?;

        let mut inventory = Inventory::deserialize(source)?;
        convert_missing_craftpreview(&mut inventory, args)?;

        Ok(Self {
            position,
            pitch,
            yaw,
            hp,
            breath,
            inventory,
        })
    }
}

/// Collect `key = value` lines up to the args terminator
fn read_args<R: BufRead>(source: &mut R) -> Result<HashMap<String, String>, PlayerDataError> {
    let mut args = HashMap::new();
    let mut line = String::new();

    loop {
        line.clear();
        if source.read_line(&mut line)? == 0 {
            return Err(PlayerDataError::Truncated {
                terminator: PLAYER_ARGS_END,
            });
        }

        let trimmed = line.trim();
        if trimmed == PLAYER_ARGS_END {
            return Ok(args);
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        // Lines without `=` carry nothing
        if let Some((key, value)) = trimmed.split_once('=') {
            args.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
}

/// Older records have no `craftpreview` list; back then `craftresult` held
/// the preview, which must not turn into a real item.
fn convert_missing_craftpreview(
    inventory: &mut Inventory,
    args: &HashMap<String, String>,
) -> Result<(), PlayerDataError> {
    if inventory.list("craftpreview").is_some() {
        return Ok(());
    }
    inventory.add_list("craftpreview", 1);

    let craftresult_is_preview = match args.get("craftresult_is_preview") {
        Some(raw) => parse_bool("craftresult_is_preview", raw)?,
        None => true,
    };
    if craftresult_is_preview {
        if let Some(result) = inventory.list_mut("craftresult") {
            result.change_item(0, None);
        }
    }
    Ok(())
}

fn required<'a>(
    args: &'a HashMap<String, String>,
    field: &'static str,
) -> Result<&'a str, PlayerDataError> {
    args.get(field)
        .map(String::as_str)
        .ok_or_else(|| PlayerDataError::Parse {
            field,
            reason: "missing".to_string(),
        })
}

/// Finite float; `NaN` and `inf` parse in Rust but never come out of a sane
/// simulation, so they are rejected here
fn parse_f32(field: &'static str, raw: &str) -> Result<f32, PlayerDataError> {
    let value: f32 = raw.trim().parse().map_err(|e| PlayerDataError::Parse {
        field,
        reason: format!("{raw:?}: {e}"),
    })?;
    if !value.is_finite() {
        return Err(PlayerDataError::Parse {
            field,
            reason: format!("{raw:?} is not a finite number"),
        });
    }
    Ok(value)
}

/// `(x,y,z)`
fn parse_v3f(field: &'static str, raw: &str) -> Result<Vec3, PlayerDataError> {
    let malformed = || PlayerDataError::Parse {
        field,
        reason: format!("{raw:?} is not of the form (x,y,z)"),
    };

    let inner = raw
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(malformed)?;
    let parts: Vec<&str> = inner.split(',').collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(malformed());
    };

    Ok(Vec3::new(
        parse_f32(field, x)?,
        parse_f32(field, y)?,
        parse_f32(field, z)?,
    ))
}

fn parse_bool(field: &'static str, raw: &str) -> Result<bool, PlayerDataError> {
    match raw.trim() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(PlayerDataError::Parse {
            field,
            reason: format!("{other:?} is not a boolean"),
        }),
    }
}

/// Optional integer field, clamped into `0..=max`
fn optional_counter(
    args: &HashMap<String, String>,
    field: &'static str,
    max: u16,
) -> Result<Option<u16>, PlayerDataError> {
    let Some(raw) = args.get(field) else {
        return Ok(None);
    };
    let value: i64 = raw.parse().map_err(|e| PlayerDataError::Parse {
        field,
        reason: format!("{raw:?}: {e}"),
    })?;
    // Clamped into 0..=max, so the cast cannot truncate
    Ok(Some(value.clamp(0, i64::from(max)) as u16))
}

/// Player record errors
#[derive(Debug, thiserror::Error)]
pub enum PlayerDataError {
    #[error("Malformed player field `{field}`: {reason}")]
    Parse { field: &'static str, reason: String },

    #[error("Player record ended before `{terminator}`")]
    Truncated { terminator: &'static str },

    #[error("Player record belongs to {found:?}, expected {expected:?}")]
    IdentityMismatch { expected: String, found: String },

    #[error("Field `{field}` cannot be written without breaking the record framing")]
    UnencodableField { field: String },

    #[error("Player record I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<InventoryError> for PlayerDataError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Parse { line, reason } => Self::Parse {
                field: "inventory",
                reason: format!("{line:?}: {reason}"),
            },
            InventoryError::Truncated { terminator } => Self::Truncated { terminator },
            InventoryError::UnencodableItem(name) => Self::UnencodableField {
                field: format!("inventory item {name:?}"),
            },
            InventoryError::UnencodableList(name) => Self::UnencodableField {
                field: format!("inventory list {name:?}"),
            },
            InventoryError::Io(e) => Self::Io(e),
        }
    }
}
