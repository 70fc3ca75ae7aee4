//! Blocking session facade.
//!
//! [`BlockingGameClient`] wraps a [`GameClient`] and a private
//! single-threaded tokio runtime. Each method blocks the calling thread
//! until its request completes. It must not be used from inside an async
//! context.

use std::{collections::VecDeque, sync::Arc};

use tokio::runtime::{Builder, Runtime};

use crate::{
    api::{
        client::{GameClient, ListQuery},
        retry::RetryPolicy,
        transport::{HttpTransport, Transport},
    },
    config::ClientConfig,
    error::{ClientError, Result},
    models::{
        AbandonedGame, Action, ActionResponse, CreatedGame, GamePage, GameState, GameStatus,
        GameSummary, HealthResponse,
    },
    observer::GameObserver,
};

/// Blocking client of the agent API.
///
/// # Examples
///
/// ```no_run
/// use crawlerverse::api::BlockingGameClient;
///
/// let client = BlockingGameClient::new(Some("cra_key".to_owned())).unwrap();
/// for game in client.list(None).take(5) {
///     println!("{}", game.unwrap());
/// }
/// ```
pub struct BlockingGameClient<T = HttpTransport> {
    inner: GameClient<T>,
    runtime: Runtime,
}

fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ClientError::Setup(format!("cannot start I/O runtime: {}", e)))
}

impl BlockingGameClient<HttpTransport> {
    /// Create a new [BlockingGameClient] from the environment.
    ///
    /// See [`GameClient::new`].
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::from_config(&ClientConfig::from_env()?.with_api_key(api_key))
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let runtime = runtime()?;
        let inner = {
            let _guard = runtime.enter();
            GameClient::from_config(config)?
        };
        Ok(BlockingGameClient { inner, runtime })
    }
}

impl<T: Transport> BlockingGameClient<T> {
    /// Assemble a blocking client from its parts.
    pub fn with_transport(
        transport: T,
        retry: RetryPolicy,
        observer: Arc<dyn GameObserver>,
    ) -> Result<Self> {
        Ok(BlockingGameClient {
            inner: GameClient::with_transport(transport, retry, observer),
            runtime: runtime()?,
        })
    }

    pub fn observer(&self) -> &dyn GameObserver {
        self.inner.observer()
    }

    pub fn create(&self, model_id: Option<&str>) -> Result<CreatedGame> {
        self.runtime.block_on(self.inner.create(model_id))
    }

    pub fn get(&self, game_id: &str) -> Result<GameState> {
        self.runtime.block_on(self.inner.get(game_id))
    }

    pub fn list_page(&self, query: &ListQuery) -> Result<GamePage> {
        self.runtime.block_on(self.inner.list_page(query))
    }

    /// Lists games lazily, one page request at a time.
    ///
    /// The iterator yields the first error it meets and then ends.
    pub fn list(&self, status: Option<GameStatus>) -> GameIter<'_, T> {
        GameIter {
            client: self,
            next: Some(ListQuery {
                status,
                ..ListQuery::default()
            }),
            buffer: VecDeque::new(),
        }
    }

    pub fn act(&self, game_id: &str, action: &Action) -> Result<ActionResponse> {
        self.runtime.block_on(self.inner.act(game_id, action))
    }

    pub fn abandon(&self, game_id: &str) -> Result<AbandonedGame> {
        self.runtime.block_on(self.inner.abandon(game_id))
    }

    pub fn health_status(&self) -> Result<HealthResponse> {
        self.runtime.block_on(self.inner.health_status())
    }

    pub fn health(&self) -> bool {
        self.runtime.block_on(self.inner.health())
    }
}

/// Iterator over the games of a listing, see [`BlockingGameClient::list`].
pub struct GameIter<'a, T> {
    client: &'a BlockingGameClient<T>,
    /// Query of the next page, `None` once the last page was fetched.
    next: Option<ListQuery>,
    buffer: VecDeque<GameSummary>,
}

impl<T: Transport> Iterator for GameIter<'_, T> {
    type Item = Result<GameSummary>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(game) = self.buffer.pop_front() {
                return Some(Ok(game));
            }
            let query = self.next.take()?;
            match self.client.list_page(&query) {
                Ok(page) => {
                    self.next = query.next_page(&page);
                    self.buffer.extend(page.games);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::{
            client::tests::{http_error, observation_json, ok},
            transport::MockTransport,
        },
        models::Direction,
        observer::LogObserver,
    };
    use mockall::Sequence;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn client(transport: MockTransport) -> BlockingGameClient<MockTransport> {
        BlockingGameClient::with_transport(
            transport,
            RetryPolicy::new(2, Duration::from_millis(1)),
            Arc::new(LogObserver),
        )
        .unwrap()
    }

    fn page(ids: &[&str], has_more: bool) -> Value {
        let games: Vec<Value> = ids
            .iter()
            .map(|id| {
                json!({
                    "gameId": id,
                    "status": "in_progress",
                    "floorReached": 1,
                    "totalTurns": 4,
                    "startedAt": "2025-02-02T10:30:00Z",
                    "spectatorUrl": format!("https://crawlerver.se/spectate/{}", id)
                })
            })
            .collect();
        json!({"games": games, "hasMore": has_more})
    }

    #[test]
    fn test_blocking_create_and_act() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_send()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                ok(
                    201,
                    json!({
                        "gameId": "game-1",
                        "observation": observation_json(1),
                        "spectatorUrl": "https://crawlerver.se/spectate/game-1"
                    }),
                )
            });
        transport
            .expect_send()
            .withf(|request| request.path == "/games/game-1/action")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                ok(
                    200,
                    json!({"observation": observation_json(2), "outcome": {"status": "in_progress"}}),
                )
            });

        let client = client(transport);
        let game = client.create(None).unwrap();
        let response = client
            .act(&game.game_id, &Action::move_to(Direction::North))
            .unwrap();
        assert_eq!(response.observation.turn, 2);
    }

    #[test]
    fn test_blocking_list_is_lazy() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        transport
            .expect_send()
            .withf(|request| request.query.contains(&("offset".to_owned(), "0".to_owned())))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok(200, page(&["g1", "g2"], true)));
        transport
            .expect_send()
            .withf(|request| request.query.contains(&("offset".to_owned(), "2".to_owned())))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok(200, page(&["g3"], false)));

        let client = client(transport);
        let mut games = client.list(None);
        // only the first page is requested until it is drained
        assert_eq!(games.next().unwrap().unwrap().game_id, "g1");
        assert_eq!(games.next().unwrap().unwrap().game_id, "g2");
        assert_eq!(games.next().unwrap().unwrap().game_id, "g3");
        assert!(games.next().is_none());
    }

    #[test]
    fn test_blocking_list_yields_error_then_ends() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| http_error(403, r#"{"error": "Forbidden"}"#));

        let client = client(transport);
        let items: Vec<_> = client.list(Some(GameStatus::InProgress)).collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ClientError::Auth { status: 403, .. })));
    }

    #[test]
    fn test_blocking_health() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_| {
            ok(
                200,
                json!({"status": "degraded", "service": "crawler-agent-api", "timestamp": "2025-02-02T10:30:00Z"}),
            )
        });

        let client = client(transport);
        assert!(!client.health());
    }
}
