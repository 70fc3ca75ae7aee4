//! Response envelopes of the agent API endpoints.
//!
//! This module contains structures for (de)serializing the JSON bodies
//! returned by the game server. Field names are `camelCase` on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{GameResultKind, GameStatus, Observation, Outcome};

/// Response of `POST /games`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedGame {
    pub game_id: String,
    /// First observation of the new game.
    pub observation: Observation,
    /// Public page where the game can be watched.
    pub spectator_url: String,
}

impl fmt::Display for CreatedGame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "game-id={}, spectator_url={}",
            self.game_id, self.spectator_url
        )
    }
}

/// Response of `POST /games/{id}/action`.
///
/// When `outcome` is in progress, `observation` is the next turn's view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub observation: Observation,
    pub outcome: Outcome,
}

/// Response of `GET /games/{id}`, same shape as [`ActionResponse`].
pub type GameState = ActionResponse;

/// Entry of `GET /games`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game_id: String,
    pub status: GameStatus,
    #[serde(default)]
    pub model_id: Option<String>,
    pub floor_reached: u32,
    pub total_turns: u32,
    #[serde(default)]
    pub result: Option<GameResultKind>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    pub spectator_url: String,
}

impl fmt::Display for GameSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "game-id={}, status={}, floor={}, turns={}",
            self.game_id, self.status, self.floor_reached, self.total_turns
        )
    }
}

/// One page of `GET /games`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePage {
    pub games: Vec<GameSummary>,
    pub has_more: bool,
}

/// Response of `POST /games/{id}/abandon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonedGame {
    pub game_id: String,
    pub status: String,
    pub floor: u32,
    pub turns: u32,
}

impl fmt::Display for AbandonedGame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "game-id={}, status={}, floor={}, turns={}",
            self.game_id, self.status, self.floor, self.turns
        )
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
