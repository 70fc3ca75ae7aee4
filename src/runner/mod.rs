//! Turn loop driving a decision function against a game.
//!
//! The loop is a pure state machine (`machine`) executed by two thin
//! schedulers with identical semantics:
//!
//! - `blocking` - [`run_game`] blocks the calling thread on every request
//!   and on the decision function.
//! - `cooperative` - [`run_game_async`] awaits every request and an async
//!   decision function, suspending only at those points.
//!
//! # Turn loop
//!
//! Each turn the decision function is called exactly once with the newest
//! observation, and its action is submitted exactly once. The loop ends
//! when the server reports a completed or abandoned outcome, when the turn
//! cap is reached (the game is then abandoned, best effort), when the
//! caller cancels between turns, or on the first error.
//!
//! # Examples
//!
//! ```no_run
//! use crawlerverse::{
//!     api::BlockingGameClient,
//!     models::{Action, Direction},
//!     runner::{RunOptions, run_game},
//! };
//!
//! let client = BlockingGameClient::new(None).unwrap();
//! let result = run_game(
//!     &client,
//!     |observation| {
//!         Ok(match observation.nearest_monster() {
//!             Some(_) => Action::wait(),
//!             None => Action::move_to(Direction::North),
//!         })
//!     },
//!     RunOptions {
//!         max_turns: Some(100),
//!         ..RunOptions::default()
//!     },
//! )
//! .unwrap();
//! println!("{}", result.end);
//! ```

mod blocking;
mod cooperative;
mod machine;

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    error::Result,
    models::{AbandonedOutcome, CompletedOutcome, Outcome},
    observer::GameObserver,
    runner::machine::TurnMachine,
};

pub use crate::runner::blocking::run_game;
pub use crate::runner::cooperative::run_game_async;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEnd {
    /// The server completed the game.
    Completed(CompletedOutcome),
    /// The server abandoned the game.
    Abandoned(AbandonedOutcome),
    /// The turn cap was reached and the game was abandoned.
    ///
    /// `abandon_confirmed` is false when the abandon request failed; the
    /// game may then still be running server-side.
    TurnLimitReached {
        floor: u32,
        turns: u32,
        abandon_confirmed: bool,
    },
    /// The caller cancelled the run between two turns. The game is left
    /// running and can be resumed with [`RunOptions::game_id`].
    Cancelled { floor: u32, turns: u32 },
}

impl GameEnd {
    /// Builds the end of a run from a terminal server outcome.
    ///
    /// Returns `None` for [`Outcome::InProgress`].
    pub fn from_outcome(outcome: Outcome) -> Option<Self> {
        match outcome {
            Outcome::InProgress => None,
            Outcome::Completed(done) => Some(GameEnd::Completed(done)),
            Outcome::Abandoned(gone) => Some(GameEnd::Abandoned(gone)),
        }
    }

    pub fn floor(&self) -> u32 {
        match self {
            GameEnd::Completed(done) => done.floor,
            GameEnd::Abandoned(gone) => gone.floor,
            GameEnd::TurnLimitReached { floor, .. } | GameEnd::Cancelled { floor, .. } => *floor,
        }
    }

    pub fn turns(&self) -> u32 {
        match self {
            GameEnd::Completed(done) => done.turns,
            GameEnd::Abandoned(gone) => gone.turns,
            GameEnd::TurnLimitReached { turns, .. } | GameEnd::Cancelled { turns, .. } => *turns,
        }
    }
}

impl fmt::Display for GameEnd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GameEnd::Completed(done) => write!(
                f,
                "completed result={:?}, floor={}, turns={}",
                done.result, done.floor, done.turns
            ),
            GameEnd::Abandoned(gone) => write!(
                f,
                "abandoned reason={:?}, floor={}, turns={}",
                gone.reason, gone.floor, gone.turns
            ),
            GameEnd::TurnLimitReached {
                floor,
                turns,
                abandon_confirmed,
            } => write!(
                f,
                "turn limit reached floor={}, turns={}, abandon_confirmed={}",
                floor, turns, abandon_confirmed
            ),
            GameEnd::Cancelled { floor, turns } => {
                write!(f, "cancelled floor={}, turns={}", floor, turns)
            }
        }
    }
}

/// Result of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub game_id: String,
    /// Known when the run created the game.
    pub spectator_url: Option<String>,
    pub end: GameEnd,
    /// Actions accepted by the server during this run.
    pub actions_submitted: u32,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "game-id={}, actions={}, end={}",
            self.game_id, self.actions_submitted, self.end
        )
    }
}

/// Flag shared between a caller and a running loop to stop it between turns.
///
/// Cancelling never interrupts a submitted action: the flag is only read
/// right before the decision function would be called.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options of a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Model label sent when creating the game.
    pub model_id: Option<String>,
    /// Resume this game instead of creating one.
    pub game_id: Option<String>,
    /// Abandon the game once this many actions were submitted.
    pub max_turns: Option<u32>,
    pub cancel: Option<CancelHandle>,
}

impl RunOptions {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled)
    }
}

/// Turns a stopped machine into the run result and reports it.
fn finish(
    machine: TurnMachine,
    spectator_url: Option<String>,
    observer: &dyn GameObserver,
) -> Result<GameResult> {
    let game_id = machine.game_id().to_owned();
    let actions_submitted = machine.submitted();
    match machine.into_result() {
        Ok(end) => {
            let result = GameResult {
                game_id,
                spectator_url,
                end,
                actions_submitted,
            };
            observer.on_finish(&result);
            Ok(result)
        }
        Err(error) => {
            observer.on_failure(&game_id, &error);
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        models::{AbandonReason, GameResultKind, Observation},
        observer::testing::RecordingObserver,
        runner::machine::{Effect, Event},
    };
    use serde_json::json;

    fn observation() -> Observation {
        serde_json::from_value(json!({
            "turn": 7,
            "floor": 3,
            "player": {
                "position": [0, 0],
                "hp": 8,
                "maxHp": 20,
                "attack": 4,
                "defense": 2,
                "equippedWeapon": null,
                "equippedArmor": null
            },
            "inventory": [],
            "visibleTiles": [],
            "messages": []
        }))
        .unwrap()
    }

    #[test]
    fn test_game_end_from_outcome() {
        assert_eq!(GameEnd::from_outcome(Outcome::InProgress), None);

        let end = GameEnd::from_outcome(Outcome::Completed(CompletedOutcome {
            result: GameResultKind::Victory,
            floor: 5,
            turns: 200,
        }))
        .unwrap();
        assert_eq!((end.floor(), end.turns()), (5, 200));
        assert_eq!(format!("{}", end), "completed result=Victory, floor=5, turns=200");

        let end = GameEnd::from_outcome(Outcome::Abandoned(AbandonedOutcome {
            reason: AbandonReason::Timeout,
            floor: 2,
            turns: 9,
        }))
        .unwrap();
        assert!(matches!(end, GameEnd::Abandoned(_)));
    }

    #[test]
    fn test_cancel_handle_is_shared() {
        let handle = CancelHandle::new();
        let options = RunOptions {
            cancel: Some(handle.clone()),
            ..RunOptions::default()
        };
        assert!(!options.is_cancelled());
        handle.cancel();
        assert!(options.is_cancelled());
        assert!(!RunOptions::default().is_cancelled());
    }

    #[test]
    fn test_finish_reports_result_to_observer() {
        let mut machine = TurnMachine::new("game-7", None);
        let done = CompletedOutcome {
            result: GameResultKind::Death,
            floor: 3,
            turns: 7,
        };
        let effect = machine.step(Event::Observed {
            observation: observation(),
            outcome: Outcome::Completed(done.clone()),
        });
        assert_eq!(effect, Effect::Stop);

        let observer = RecordingObserver::default();
        let spectator_url = Some("https://crawlerver.se/spectate/game-7".to_owned());
        let result = finish(machine, spectator_url, &observer).unwrap();

        assert_eq!(result.game_id, "game-7");
        assert_eq!(result.end, GameEnd::Completed(done));
        assert_eq!(result.actions_submitted, 0);
        assert_eq!(*observer.finished.lock().unwrap(), [result]);
        assert!(observer.failures.lock().unwrap().is_empty());
    }

    #[test]
    fn test_finish_reports_failure_to_observer() {
        let mut machine = TurnMachine::new("game-7", None);
        machine.step(Event::Observed {
            observation: observation(),
            outcome: Outcome::InProgress,
        });
        let effect = machine.step(Event::DecisionFailed(anyhow::anyhow!("no move left")));
        assert_eq!(effect, Effect::Stop);

        let observer = RecordingObserver::default();
        let error = finish(machine, None, &observer).unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Decision);
        assert_eq!(*observer.failures.lock().unwrap(), [ErrorKind::Decision]);
        assert!(observer.finished.lock().unwrap().is_empty());
    }
}
