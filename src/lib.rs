//! Crawlerverse - Client library for playing Crawlerverse roguelike games.
//!
//! Agents play by exchanging JSON requests with the Crawlerverse agent API:
//! each turn the server sends an [`Observation`], the agent answers with an
//! [`Action`] and the server replies with the next observation and an
//! [`Outcome`].
//!
//! # Overview
//!
//! - [`api`] - Transport, error mapping, retries and the session facades
//!   ([`GameClient`] and [`BlockingGameClient`])
//! - [`models`] - Typed observations, actions, outcomes and responses
//! - [`runner`] - Turn loop calling a decision function until the game ends
//! - [`observer`] - Injectable sink for request, retry and turn events
//! - [`config`] - Layered configuration (defaults, YAML file, environment)
//! - [`error`] - The [`ClientError`] taxonomy
//!
//! # Examples
//!
//! ```no_run
//! use crawlerverse::{
//!     BlockingGameClient, RunOptions, run_game,
//!     models::{Action, Direction},
//! };
//!
//! // API key from CRAWLERVERSE_API_KEY
//! let client = BlockingGameClient::new(None).unwrap();
//! let result = run_game(
//!     &client,
//!     |observation| {
//!         if let Some((tile, _)) = observation.nearest_monster() {
//!             let (px, py) = observation.player.position;
//!             if (tile.x - px).abs() + (tile.y - py).abs() == 1 {
//!                 let direction = Direction::ALL
//!                     .into_iter()
//!                     .find(|d| d.offset() == (tile.x - px, tile.y - py));
//!                 if let Some(direction) = direction {
//!                     return Ok(Action::attack(direction));
//!                 }
//!             }
//!         }
//!         Ok(Action::wait())
//!     },
//!     RunOptions::default(),
//! )
//! .unwrap();
//! println!("{}", result);
//! ```
//!
//! # Logging
//!
//! The library logs through the `log` facade and never installs a logger.
//! Diagnostics are also delivered to the [`observer::GameObserver`] given
//! to the client, [`observer::LogObserver`] by default.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod observer;
pub mod runner;

pub use crate::api::{BlockingGameClient, GameClient};
pub use crate::error::{ClientError, ErrorKind, Result};
pub use crate::models::{Action, Observation, Outcome};
pub use crate::runner::{CancelHandle, GameEnd, GameResult, RunOptions, run_game, run_game_async};
