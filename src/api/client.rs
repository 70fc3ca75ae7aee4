//! Async session facade over the agent API.
//!
//! This module provides the [`GameClient`] struct, one method per server
//! capability. Every method is a single request routed through the retry
//! policy (idempotent reads only), the error mapping and the decoding layer.

use std::{sync::Arc, time::Instant};

use futures::{Stream, TryStreamExt, stream};
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::{
    api::{
        errors::{decode, map_transport_error},
        retry::RetryPolicy,
        transport::{ApiRequest, HttpTransport, RawResponse, Transport},
    },
    config::ClientConfig,
    error::{ClientError, Result},
    models::{
        AbandonedGame, Action, ActionResponse, CreatedGame, GamePage, GameState, GameStatus,
        GameSummary, HealthResponse,
    },
    observer::{GameObserver, LogObserver, ResponseSummary},
};

/// Number of games requested per `/games` page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Whether a request may be repeated without changing its meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Idempotency {
    /// Reads, retried by the policy.
    Idempotent,
    /// Calls with game-state side effects, sent exactly once.
    SideEffecting,
}

/// Filter and window of a `/games` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<GameStatus>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            status: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl ListQuery {
    fn to_request(&self) -> ApiRequest {
        let request = ApiRequest::get("/games")
            .with_query("limit", self.limit)
            .with_query("offset", self.offset);
        match self.status {
            Some(status) => request.with_query("status", status),
            None => request,
        }
    }

    /// Query of the page following `page`, or `None` when `page` is the last.
    ///
    /// An empty page ends the listing even if the server claims more.
    pub fn next_page(&self, page: &GamePage) -> Option<ListQuery> {
        (page.has_more && !page.games.is_empty()).then(|| ListQuery {
            offset: self.offset + page.games.len() as u32,
            ..self.clone()
        })
    }
}

/// Async client of the agent API.
///
/// The client owns its transport; the underlying connection pool is
/// released when the client is dropped.
///
/// # Examples
///
/// ```no_run
/// use crawlerverse::api::GameClient;
/// use crawlerverse::models::{Action, Direction};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), crawlerverse::ClientError> {
/// // falls back to CRAWLERVERSE_API_KEY
/// let client = GameClient::new(None)?;
/// let game = client.create(Some("my-model")).await?;
/// let response = client.act(&game.game_id, &Action::move_to(Direction::North)).await?;
/// println!("{}", response.outcome);
/// # Ok(())
/// # }
/// ```
pub struct GameClient<T = HttpTransport> {
    /// Transport sending the requests
    transport: T,
    /// Backoff of idempotent requests
    retry: RetryPolicy,
    /// Diagnostics sink
    observer: Arc<dyn GameObserver>,
}

impl GameClient<HttpTransport> {
    /// Create a new [GameClient] from the environment.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Credential. When `None`, `CRAWLERVERSE_API_KEY` is used.
    ///
    /// # Errors
    ///
    /// [`ClientError::MissingCredential`] if no key can be found, before any
    /// network attempt.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::from_config(&ClientConfig::from_env()?.with_api_key(api_key))
    }

    /// Create a new [GameClient] from an explicit configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(GameClient::with_transport(
            transport,
            RetryPolicy::from(&config.retry),
            Arc::new(LogObserver),
        ))
    }
}

impl<T: Transport> GameClient<T> {
    /// Assemble a client from its parts.
    pub fn with_transport(
        transport: T,
        retry: RetryPolicy,
        observer: Arc<dyn GameObserver>,
    ) -> Self {
        GameClient {
            transport,
            retry,
            observer,
        }
    }

    /// Replace the diagnostics sink.
    pub fn with_observer(mut self, observer: Arc<dyn GameObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn observer(&self) -> &dyn GameObserver {
        self.observer.as_ref()
    }

    /// Sends one request, reporting it to the observer and mapping failures.
    async fn call(&self, request: ApiRequest) -> Result<RawResponse> {
        let method = request.method.clone();
        let path = request.path.clone();
        self.observer.on_request(&method, &path);

        let started = Instant::now();
        let result = self
            .transport
            .send(request)
            .await
            .map_err(map_transport_error);

        self.observer.on_response(&ResponseSummary {
            method,
            path,
            status: match &result {
                Ok(response) => Some(response.status),
                Err(error) => error.status(),
            },
            error: result.as_ref().err().map(ClientError::kind),
            elapsed: started.elapsed(),
        });
        result
    }

    async fn fetch<R: DeserializeOwned>(
        &self,
        request: ApiRequest,
        idempotency: Idempotency,
    ) -> Result<R> {
        let response = match idempotency {
            Idempotency::Idempotent => {
                let name = format!("{} {}", request.method, request.path);
                self.retry
                    .execute(self.observer.as_ref(), &name, || self.call(request.clone()))
                    .await?
            }
            Idempotency::SideEffecting => self.call(request).await?,
        };
        decode(response)
    }

    /// Request `POST /games` to start a new game.
    ///
    /// Not retried: a repeated request would start a second game.
    ///
    /// # Arguments
    ///
    /// * `model_id` - Optional label of the model playing, shown on the leaderboard.
    pub async fn create(&self, model_id: Option<&str>) -> Result<CreatedGame> {
        let body = match model_id {
            Some(model_id) => json!({ "modelId": model_id }),
            None => json!({}),
        };
        let game: CreatedGame = self
            .fetch(ApiRequest::post("/games").with_body(body), Idempotency::SideEffecting)
            .await?;
        info!("created game {}", game);
        Ok(game)
    }

    /// Request `GET /games/{id}` to get the current observation and outcome.
    pub async fn get(&self, game_id: &str) -> Result<GameState> {
        self.fetch(
            ApiRequest::get(format!("/games/{}", game_id)),
            Idempotency::Idempotent,
        )
        .await
    }

    /// Request one page of `GET /games`.
    pub async fn list_page(&self, query: &ListQuery) -> Result<GamePage> {
        self.fetch(query.to_request(), Idempotency::Idempotent).await
    }

    /// Lists games, optionally filtered by status.
    ///
    /// Pages are requested lazily as the stream is polled and the stream ends
    /// after the page whose `hasMore` is false. The stream cannot be
    /// restarted; call `list` again for a fresh listing.
    pub fn list(
        &self,
        status: Option<GameStatus>,
    ) -> impl Stream<Item = Result<GameSummary>> + '_ {
        let first = Some(ListQuery {
            status,
            ..ListQuery::default()
        });
        stream::try_unfold(first, move |next| async move {
            let Some(query) = next else {
                return Ok::<_, ClientError>(None);
            };
            let page = self.list_page(&query).await?;
            let following = query.next_page(&page);
            Ok(Some((
                stream::iter(page.games.into_iter().map(Ok::<_, ClientError>)),
                following,
            )))
        })
        .try_flatten()
    }

    /// Request `POST /games/{id}/action` to play one turn.
    ///
    /// Never retried: the action may already have been applied when a
    /// failure is reported. The action is checked locally first and a
    /// malformed one is rejected without a request.
    pub async fn act(&self, game_id: &str, action: &Action) -> Result<ActionResponse> {
        action.check().map_err(|message| ClientError::Validation {
            status: None,
            message,
            code: None,
            details: None,
            body: String::new(),
        })?;
        let body = serde_json::to_value(action)
            .map_err(|e| ClientError::Protocol(format!("cannot encode action: {}", e)))?;
        self.fetch(
            ApiRequest::post(format!("/games/{}/action", game_id)).with_body(body),
            Idempotency::SideEffecting,
        )
        .await
    }

    /// Request `POST /games/{id}/abandon` to end a game early.
    pub async fn abandon(&self, game_id: &str) -> Result<AbandonedGame> {
        let abandoned: AbandonedGame = self
            .fetch(
                ApiRequest::post(format!("/games/{}/abandon", game_id)),
                Idempotency::SideEffecting,
            )
            .await?;
        info!("abandoned game {}", abandoned);
        Ok(abandoned)
    }

    /// Request `GET /health`.
    pub async fn health_status(&self) -> Result<HealthResponse> {
        self.fetch(ApiRequest::get("/health"), Idempotency::Idempotent)
            .await
    }

    /// Whether the service answers and reports itself healthy.
    pub async fn health(&self) -> bool {
        match self.health_status().await {
            Ok(health) => health.is_ok(),
            Err(e) => {
                warn!("health check failed: {}", e);
                false
            }
        }
    }
}
