//! Result of a turn, or the terminal state of a game.
//!
//! [`Outcome`] is internally tagged on `status`. Decoding reads the tag first
//! and fails on a missing or unknown tag instead of falling back to a default.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a completed game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResultKind {
    Victory,
    Death,
}

/// Why the server abandoned a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonReason {
    Timeout,
    Disconnected,
}

/// Fields of a `completed` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedOutcome {
    pub result: GameResultKind,
    pub floor: u32,
    pub turns: u32,
}

/// Fields of an `abandoned` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonedOutcome {
    pub reason: AbandonReason,
    pub floor: u32,
    pub turns: u32,
}

/// Tagged outcome of the most recent turn.
///
/// For `in_progress` the next observation travels next to the outcome in the
/// same response envelope (see [`crate::models::ActionResponse`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    Completed(CompletedOutcome),
    Abandoned(AbandonedOutcome),
}

impl Outcome {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Outcome::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_in_progress()
    }

    /// Wire tag of the variant.
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::InProgress => "in_progress",
            Outcome::Completed(_) => "completed",
            Outcome::Abandoned(_) => "abandoned",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.status())?;
        match self {
            Outcome::InProgress => Ok(()),
            Outcome::Completed(done) => write!(
                f,
                " result={:?}, floor={}, turns={}",
                done.result, done.floor, done.turns
            ),
            Outcome::Abandoned(gone) => write!(
                f,
                " reason={:?}, floor={}, turns={}",
                gone.reason, gone.floor, gone.turns
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_progress() {
        let outcome: Outcome = serde_json::from_value(json!({"status": "in_progress"})).unwrap();
        assert_eq!(outcome, Outcome::InProgress);
        assert!(outcome.is_in_progress());
        assert_eq!(serde_json::to_value(&outcome).unwrap(), json!({"status": "in_progress"}));
    }

    #[test]
    fn test_completed_selects_variant() {
        let json = json!({"status": "completed", "result": "victory", "floor": 5, "turns": 200});
        let outcome: Outcome = serde_json::from_value(json.clone()).unwrap();
        let Outcome::Completed(done) = &outcome else {
            panic!("expected completed, got {outcome:?}");
        };
        assert_eq!(done.result, GameResultKind::Victory);
        assert_eq!(done.floor, 5);
        assert_eq!(done.turns, 200);
        assert!(outcome.is_terminal());
        assert_eq!(serde_json::to_value(&outcome).unwrap(), json);
    }

    #[test]
    fn test_abandoned_selects_variant() {
        let json = json!({"status": "abandoned", "reason": "timeout", "floor": 2, "turns": 50});
        let outcome: Outcome = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(
            outcome,
            Outcome::Abandoned(AbandonedOutcome {
                reason: AbandonReason::Timeout,
                floor: 2,
                turns: 50,
            })
        );
        assert_eq!(serde_json::to_value(&outcome).unwrap(), json);
    }

    #[test]
    fn test_display_starts_with_wire_tag() {
        let outcome = Outcome::Completed(CompletedOutcome {
            result: GameResultKind::Death,
            floor: 3,
            turns: 47,
        });
        assert_eq!(outcome.status(), "completed");
        assert_eq!(
            format!("{}", outcome),
            "completed result=Death, floor=3, turns=47"
        );
        assert_eq!(format!("{}", Outcome::InProgress), "in_progress");
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let json = json!({"status": "paused", "floor": 2, "turns": 50});
        assert!(serde_json::from_value::<Outcome>(json).is_err());
    }

    #[test]
    fn test_missing_tag_is_rejected() {
        let json = json!({"result": "victory", "floor": 5, "turns": 200});
        assert!(serde_json::from_value::<Outcome>(json).is_err());
    }

    #[test]
    fn test_tag_must_match_fields() {
        // completed tag without the completed fields must not decode
        let json = json!({"status": "completed", "reason": "timeout", "floor": 1, "turns": 1});
        assert!(serde_json::from_value::<Outcome>(json).is_err());
    }
}
