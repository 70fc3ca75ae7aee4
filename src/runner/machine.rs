//! Pure state machine of the turn loop.
//!
//! [`TurnMachine::step`] consumes one [`Event`] (what the last effect
//! produced) and returns the next [`Effect`] to perform. It never performs
//! I/O; the schedulers do.

use std::{fmt, mem};

use log::debug;

use crate::{
    error::ClientError,
    models::{AbandonedGame, Action, Observation, Outcome},
    runner::GameEnd,
};

/// States of the turn loop.
#[derive(Debug)]
pub(crate) enum Phase {
    AwaitingObservation,
    AwaitingDecision,
    SubmittingAction,
    Abandoning,
    Terminated(GameEnd),
    Failed(ClientError),
}

/// What the last effect produced.
#[derive(Debug)]
pub(crate) enum Event {
    /// A game view, from create, get or act.
    Observed {
        observation: Observation,
        outcome: Outcome,
    },
    Decided(Action),
    DecisionFailed(anyhow::Error),
    CallFailed(ClientError),
    /// Result of the best-effort abandon, `None` if it failed.
    Abandoned(Option<AbandonedGame>),
    /// The caller cancelled before a decision.
    Cancelled,
}

/// What the scheduler must do next.
#[derive(Debug, PartialEq)]
pub(crate) enum Effect {
    /// Call the decision function with this observation.
    Decide(Observation),
    /// Submit this action.
    Submit(Action),
    /// Abandon the game, best effort.
    Abandon,
    /// The loop is over; see [`TurnMachine::into_result`].
    Stop,
}

pub(crate) struct TurnMachine {
    game_id: String,
    max_turns: Option<u32>,
    phase: Phase,
    /// Actions accepted by the server.
    submitted: u32,
    /// Floor and turn of the newest observation.
    floor: u32,
    turn: u32,
}

impl fmt::Display for TurnMachine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "game-id={}, submitted={}, floor={}, turn={}",
            self.game_id, self.submitted, self.floor, self.turn
        )
    }
}

impl TurnMachine {
    pub(crate) fn new(game_id: impl Into<String>, max_turns: Option<u32>) -> Self {
        TurnMachine {
            game_id: game_id.into(),
            max_turns,
            phase: Phase::AwaitingObservation,
            submitted: 0,
            floor: 0,
            turn: 0,
        }
    }

    pub(crate) fn game_id(&self) -> &str {
        &self.game_id
    }

    pub(crate) fn submitted(&self) -> u32 {
        self.submitted
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Applies `event` to the current phase and returns the next effect.
    ///
    /// # Panics
    ///
    /// On an event the current phase cannot receive, which is a scheduler
    /// bug.
    pub(crate) fn step(&mut self, event: Event) -> Effect {
        let phase = mem::replace(&mut self.phase, Phase::AwaitingObservation);
        let (phase, effect) = match (phase, event) {
            (
                Phase::AwaitingObservation,
                Event::Observed {
                    observation,
                    outcome,
                },
            ) => self.observe(observation, outcome),
            (
                Phase::SubmittingAction,
                Event::Observed {
                    observation,
                    outcome,
                },
            ) => {
                self.submitted += 1;
                self.observe(observation, outcome)
            }
            (Phase::AwaitingDecision, Event::Decided(action)) => {
                (Phase::SubmittingAction, Effect::Submit(action))
            }
            (Phase::AwaitingDecision, Event::DecisionFailed(source)) => (
                Phase::Failed(ClientError::Decision {
                    game_id: self.game_id.clone(),
                    turn: self.turn,
                    source,
                }),
                Effect::Stop,
            ),
            (Phase::AwaitingDecision, Event::Cancelled) => (
                Phase::Terminated(GameEnd::Cancelled {
                    floor: self.floor,
                    turns: self.turn,
                }),
                Effect::Stop,
            ),
            (
                Phase::AwaitingObservation | Phase::SubmittingAction,
                Event::CallFailed(ClientError::GameOver { outcome, .. }),
            ) if outcome.is_terminal() => self.terminate(outcome),
            (Phase::AwaitingObservation | Phase::SubmittingAction, Event::CallFailed(error)) => {
                (Phase::Failed(error), Effect::Stop)
            }
            (Phase::Abandoning, Event::Abandoned(abandoned)) => {
                let (floor, turns) = abandoned
                    .as_ref()
                    .map_or((self.floor, self.turn), |game| (game.floor, game.turns));
                (
                    Phase::Terminated(GameEnd::TurnLimitReached {
                        floor,
                        turns,
                        abandon_confirmed: abandoned.is_some(),
                    }),
                    Effect::Stop,
                )
            }
            (phase, event) => unreachable!("event {:?} in phase {:?}", event, phase),
        };
        self.phase = phase;
        effect
    }

    fn observe(&mut self, observation: Observation, outcome: Outcome) -> (Phase, Effect) {
        self.floor = observation.floor;
        self.turn = observation.turn;

        if outcome.is_terminal() {
            return self.terminate(outcome);
        }
        if self.max_turns.is_some_and(|max| self.submitted >= max) {
            debug!("turn cap reached, abandoning {}", self);
            return (Phase::Abandoning, Effect::Abandon);
        }
        (Phase::AwaitingDecision, Effect::Decide(observation))
    }

    fn terminate(&mut self, outcome: Outcome) -> (Phase, Effect) {
        match GameEnd::from_outcome(outcome) {
            Some(end) => {
                self.floor = end.floor();
                self.turn = end.turns();
                (Phase::Terminated(end), Effect::Stop)
            }
            None => unreachable!("terminate called with an in-progress outcome"),
        }
    }

    /// Consumes a stopped machine.
    ///
    /// # Panics
    ///
    /// If the last effect was not [`Effect::Stop`].
    pub(crate) fn into_result(self) -> Result<GameEnd, ClientError> {
        match self.phase {
            Phase::Terminated(end) => Ok(end),
            Phase::Failed(error) => Err(error),
            phase => unreachable!("loop stopped in phase {:?}", phase),
        }
    }
}
