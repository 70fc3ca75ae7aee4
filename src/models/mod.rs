//! Typed object graph of the agent API.
//!
//! Every model is an immutable value snapshot decoded from (or encoded to)
//! the server's JSON. Internal names follow Rust conventions and the
//! `camelCase` wire names are mapped by `serde` attributes only, so the
//! translation is the same in both directions.
//!
//! # Modules
//!
//! - `types` - Enumerations: [`Direction`], [`TileType`], [`GameStatus`]
//! - `observation` - The per-turn [`Observation`] and its derived queries
//! - `action` - The tagged [`Action`] union submitted each turn
//! - `outcome` - The tagged [`Outcome`] union returned each turn
//! - `responses` - Endpoint response envelopes
//!
//! # Discriminated unions
//!
//! [`Action`] is tagged by its `action` key and [`Outcome`] by its `status`
//! key. Decoding dispatches on the tag and rejects unknown tags.

mod action;
mod observation;
mod outcome;
mod responses;
mod types;

pub use crate::models::action::Action;
pub use crate::models::observation::{InventoryItem, Monster, Observation, Player, VisibleTile};
pub use crate::models::outcome::{
    AbandonReason, AbandonedOutcome, CompletedOutcome, GameResultKind, Outcome,
};
pub use crate::models::responses::{
    AbandonedGame, ActionResponse, CreatedGame, GamePage, GameState, GameSummary, HealthResponse,
};
pub use crate::models::types::{Direction, GameStatus, TileType};
