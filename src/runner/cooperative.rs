//! Cooperative scheduler of the turn loop.
//!
//! Same state machine as the blocking loop; every request and the decision
//! function are awaited, so other tasks on the same runtime make progress
//! while a turn is pending.

use std::future::Future;

use log::{info, warn};

use crate::{
    api::{GameClient, Transport},
    error::Result,
    models::{Action, GameState, Observation, Outcome},
    runner::{
        GameResult, RunOptions, finish,
        machine::{Effect, Event, TurnMachine},
    },
};

/// Plays a game until it ends, awaiting `decide` once per turn.
///
/// The decision function receives an owned copy of the newest observation
/// so its future may outlive the turn, e.g. while calling a remote model.
/// Semantics are those of [`crate::runner::run_game`].
///
/// # Examples
///
/// ```no_run
/// use crawlerverse::{api::GameClient, models::Action, runner::{RunOptions, run_game_async}};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), crawlerverse::ClientError> {
/// let client = GameClient::new(None)?;
/// let result = run_game_async(
///     &client,
///     |observation| async move {
///         println!("{}", observation);
///         Ok(Action::wait())
///     },
///     RunOptions::default(),
/// )
/// .await?;
/// println!("{}", result);
/// # Ok(())
/// # }
/// ```
pub async fn run_game_async<T, F, Fut>(
    client: &GameClient<T>,
    mut decide: F,
    options: RunOptions,
) -> Result<GameResult>
where
    T: Transport,
    F: FnMut(Observation) -> Fut,
    Fut: Future<Output = anyhow::Result<Action>>,
{
    let (game_id, spectator_url, opening) = match &options.game_id {
        Some(game_id) => {
            info!("resuming game {}", game_id);
            let state = client.get(game_id).await?;
            (game_id.clone(), None, state)
        }
        None => {
            let game = client.create(options.model_id.as_deref()).await?;
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
            Effect::Decide(observation) => match decide(observation.clone()).await {
                Ok(action) => {
                    observer.on_decision(machine.game_id(), &observation, &action);
                    Event::Decided(action)
                }
                Err(e) => Event::DecisionFailed(e),
            },
            Effect::Submit(action) => match client.act(machine.game_id(), &action).await {
                Ok(response) => Event::Observed {
                    observation: response.observation,
                    outcome: response.outcome,
                },
                Err(e) => Event::CallFailed(e),
            },
            Effect::Abandon => match client.abandon(machine.game_id()).await {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{MockTransport, RawResponse, RetryPolicy, TransportError},
        error::ClientError,
        models::Direction,
        observer::testing::RecordingObserver,
        runner::{CancelHandle, GameEnd},
    };
    use mockall::Sequence;
    use serde_json::{Value, json};
    use std::{sync::Arc, time::Duration};

    fn observation_json(turn: u32) -> Value {
        json!({
            "turn": turn,
            "floor": 1,
            "player": {
                "position": [0, 0],
                "hp": 20,
                "maxHp": 20,
                "attack": 5,
                "defense": 3,
                "equippedWeapon": null,
                "equippedArmor": null
            },
            "inventory": [],
            "visibleTiles": [{"x": 0, "y": -1, "type": "floor", "items": []}],
            "messages": []
        })
    }

    fn response(status: u16, body: Value) -> std::result::Result<RawResponse, TransportError> {
        Ok(RawResponse { status, body })
    }

    fn client(transport: MockTransport) -> (GameClient<MockTransport>, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        let client = GameClient::with_transport(
            transport,
            RetryPolicy::new(3, Duration::from_millis(1)),
            observer.clone(),
        );
        (client, observer)
    }

    fn expect_created(transport: &mut MockTransport, seq: &mut Sequence) {
        transport
            .expect_send()
            .withf(|request| request.body == Some(json!({"modelId": "async-agent"})))
            .times(1)
            .in_sequence(seq)
            .returning(|_| {
                response(
                    201,
                    json!({
                        "gameId": "game-2",
                        "observation": observation_json(1),
                        "spectatorUrl": "https://crawlerver.se/spectate/game-2"
                    }),
                )
            });
    }

    fn options() -> RunOptions {
        RunOptions {
            model_id: Some("async-agent".to_owned()),
            ..RunOptions::default()
        }
    }

    #[tokio::test]
    async fn test_async_decision_is_awaited_each_turn() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        expect_created(&mut transport, &mut seq);
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                response(
                    200,
                    json!({"observation": observation_json(2), "outcome": {"status": "in_progress"}}),
                )
            });
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                response(
                    200,
                    json!({
                        "observation": observation_json(3),
                        "outcome": {"status": "completed", "result": "death", "floor": 1, "turns": 3}
                    }),
                )
            });

        let (client, observer) = client(transport);
        let result = run_game_async(
            &client,
            |observation| async move {
                tokio::task::yield_now().await;
                Ok(if observation.can_move(Direction::North) {
                    Action::move_to(Direction::North)
                } else {
                    Action::wait()
                })
            },
            options(),
        )
        .await
        .unwrap();

        assert_eq!(result.actions_submitted, 2);
        assert!(matches!(result.end, GameEnd::Completed(_)));
        let decisions = observer.decisions.lock().unwrap();
        assert_eq!(
            decisions.iter().map(|(turn, _)| *turn).collect::<Vec<_>>(),
            [1, 2]
        );
    }

    #[tokio::test]
    async fn test_async_decision_error() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        expect_created(&mut transport, &mut seq);

        let (client, _) = client(transport);
        let error = run_game_async(
            &client,
            |_| async { Err(anyhow::anyhow!("llm quota exceeded")) },
            options(),
        )
        .await
        .unwrap_err();

        let ClientError::Decision { game_id, source, .. } = error else {
            panic!("expected decision error");
        };
        assert_eq!(game_id, "game-2");
        assert_eq!(source.to_string(), "llm quota exceeded");
    }

    #[tokio::test]
    async fn test_async_turn_cap() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        expect_created(&mut transport, &mut seq);
        transport
            .expect_send()
            .withf(|request| request.path == "/games/game-2/abandon")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                response(
                    200,
                    json!({"gameId": "game-2", "status": "abandoned", "floor": 1, "turns": 1}),
                )
            });

        let (client, _) = client(transport);
        let result = run_game_async(
            &client,
            |_| async { Ok(Action::wait()) },
            RunOptions {
                max_turns: Some(0),
                ..options()
            },
        )
        .await
        .unwrap();

        assert_eq!(result.actions_submitted, 0);
        assert!(matches!(
            result.end,
            GameEnd::TurnLimitReached {
                abandon_confirmed: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_async_turn_cap_abandons_after_three_actions() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        expect_created(&mut transport, &mut seq);
        for n in 2..=4 {
            transport
                .expect_send()
                .withf(|request| {
                    request.path == "/games/game-2/action"
                        && request.body == Some(json!({"action": "wait"}))
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| {
                    response(
                        200,
                        json!({"observation": observation_json(n), "outcome": {"status": "in_progress"}}),
                    )
                });
        }
        transport
            .expect_send()
            .withf(|request| request.path == "/games/game-2/abandon")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                response(
                    200,
                    json!({"gameId": "game-2", "status": "abandoned", "floor": 1, "turns": 4}),
                )
            });

        let (client, observer) = client(transport);
        let result = run_game_async(
            &client,
            |_| async { Ok(Action::wait()) },
            RunOptions {
                max_turns: Some(3),
                ..options()
            },
        )
        .await
        .unwrap();

        assert_eq!(observer.decisions.lock().unwrap().len(), 3);
        assert_eq!(result.actions_submitted, 3);
        assert_eq!(
            result.end,
            GameEnd::TurnLimitReached {
                floor: 1,
                turns: 4,
                abandon_confirmed: true
            }
        );
    }

    #[tokio::test]
    async fn test_async_cancel_before_first_decision() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        expect_created(&mut transport, &mut seq);

        let (client, _) = client(transport);
        let cancel = CancelHandle::new();
        cancel.cancel();
        let result = run_game_async(
            &client,
            |_| async { Ok(Action::wait()) },
            RunOptions {
                cancel: Some(cancel),
                ..options()
            },
        )
        .await
        .unwrap();

        assert_eq!(result.end, GameEnd::Cancelled { floor: 1, turns: 1 });
    }

    #[tokio::test]
    async fn test_async_resume_retries_the_fetch() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(TransportError::Network("timed out".to_owned())));
        transport
            .expect_send()
            .withf(|request| request.path == "/games/game-2")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                response(
                    200,
                    json!({
                        "observation": observation_json(8),
                        "outcome": {"status": "completed", "result": "victory", "floor": 1, "turns": 8}
                    }),
                )
            });

        let (client, observer) = client(transport);
        let result = run_game_async(
            &client,
            |_| async { Ok(Action::wait()) },
            RunOptions {
                game_id: Some("game-2".to_owned()),
                ..RunOptions::default()
            },
        )
        .await
        .unwrap();

        assert!(matches!(result.end, GameEnd::Completed(_)));
        assert_eq!(observer.retries.lock().unwrap().len(), 1);
    }
}
