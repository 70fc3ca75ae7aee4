//! Blocking scheduler of the turn loop.

use log::{info, warn};

use crate::{
    api::{BlockingGameClient, Transport},
    error::Result,
    models::{Action, GameState, Observation, Outcome},
    runner::{
        GameResult, RunOptions, finish,
        machine::{Effect, Event, TurnMachine},
    },
};

/// Plays a game until it ends, calling `decide` once per turn.
///
/// A game is created unless `options.game_id` names one to resume. Every
/// request and every call to `decide` blocks the calling thread.
///
/// # Arguments
///
/// * `client` - Blocking client used for every request
/// * `decide` - Decision function, called exactly once per observation
/// * `options` - Model label, game to resume, turn cap and cancel flag
///
/// # Errors
///
/// The first error met: a failed create or resume, a failed action
/// submission, or a [`ClientError::Decision`] wrapping the error returned by
/// `decide`. Errors are never turned into an outcome, except
/// [`ClientError::GameOver`] which carries the server's own outcome.
pub fn run_game<T, F>(
    client: &BlockingGameClient<T>,
    mut decide: F,
    options: RunOptions,
) -> Result<GameResult>
where
    T: Transport,
    F: FnMut(&Observation) -> anyhow::Result<Action>,
{
    let (game_id, spectator_url, opening) = match &options.game_id {
        Some(game_id) => {
            info!("resuming game {}", game_id);
            let state = client.get(game_id)?;
            (game_id.clone(), None, state)
        }
        None => {
            let game = client.create(options.model_id.as_deref())?;
            let state = GameState {
                observation: game.observation,
                outcome: Outcome::InProgress,
            };
            (game.game_id, Some(game.spectator_url), state)
        }
    };

    let observer = client.observer();
    let mut machine = TurnMachine::new(game_id, options.max_turns);
    let mut effect = machine.step(Event::Observed {
        observation: opening.observation,
        outcome: opening.outcome,
    });

    loop {
        let event = match effect {
            Effect::Stop => break,
            Effect::Decide(_) if options.is_cancelled() => Event::Cancelled,
            Effect::Decide(observation) => match decide(&observation) {
                Ok(action) => {
                    observer.on_decision(machine.game_id(), &observation, &action);
                    Event::Decided(action)
                }
                Err(e) => Event::DecisionFailed(e),
            },
            Effect::Submit(action) => match client.act(machine.game_id(), &action) {
                Ok(response) => Event::Observed {
                    observation: response.observation,
                    outcome: response.outcome,
                },
                Err(e) => Event::CallFailed(e),
            },
            Effect::Abandon => match client.abandon(machine.game_id()) {
                Ok(abandoned) => Event::Abandoned(Some(abandoned)),
                Err(e) => {
                    warn!("could not abandon game {}: {}", machine.game_id(), e);
                    Event::Abandoned(None)
                }
            },
        };
        effect = machine.step(event);
    }

    finish(machine, spectator_url, observer)
}
