//! Injectable sink for client diagnostics.
//!
//! A [`GameObserver`] is handed to the client when it is built and receives
//! request summaries, retry events, per-turn decisions and the final result
//! of a run. The default [`LogObserver`] forwards everything to the `log`
//! facade; the library never installs a logger itself.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Method;

use crate::{
    error::{ClientError, ErrorKind},
    models::{Action, Observation},
    runner::GameResult,
};

/// Summary of one finished HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSummary {
    pub method: Method,
    pub path: String,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Error kind, when the exchange failed.
    pub error: Option<ErrorKind>,
    pub elapsed: Duration,
}

/// Emitted by the retry policy right before it waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    /// Operation being retried, e.g. `GET /games/abc`.
    pub operation: String,
    /// 1-based number of the attempt that just failed.
    pub attempt: u32,
    /// Wait before the next attempt.
    pub delay: Duration,
    pub kind: ErrorKind,
}

/// Receives client events. Every method defaults to doing nothing.
pub trait GameObserver: Send + Sync {
    fn on_request(&self, _method: &Method, _path: &str) {}

    fn on_response(&self, _summary: &ResponseSummary) {}

    fn on_retry(&self, _event: &RetryEvent) {}

    /// Called once per turn, after the decision function chose `action`.
    fn on_decision(&self, _game_id: &str, _observation: &Observation, _action: &Action) {}

    fn on_finish(&self, _result: &GameResult) {}

    fn on_failure(&self, _game_id: &str, _error: &ClientError) {}
}

/// [`GameObserver`] writing every event to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl GameObserver for LogObserver {
    fn on_request(&self, method: &Method, path: &str) {
        debug!("request {} {}", method, path);
    }

    fn on_response(&self, summary: &ResponseSummary) {
        match (summary.status, summary.error) {
            (_, Some(kind)) => debug!(
                "response {} {} failed kind={} status={:?} in {:?}",
                summary.method, summary.path, kind, summary.status, summary.elapsed
            ),
            (status, None) => debug!(
                "response {} {} status={:?} in {:?}",
                summary.method, summary.path, status, summary.elapsed
            ),
        }
    }

    fn on_retry(&self, event: &RetryEvent) {
        warn!(
            "{} failed with {} (attempt {}), retrying in {:?}",
            event.operation, event.kind, event.attempt, event.delay
        );
    }

    fn on_decision(&self, game_id: &str, observation: &Observation, action: &Action) {
        debug!(
            "game {} turn {}: decided {}",
            game_id, observation.turn, action
        );
    }

    fn on_finish(&self, result: &GameResult) {
        info!("game {} finished: {}", result.game_id, result.end);
    }

    fn on_failure(&self, game_id: &str, error: &ClientError) {
        warn!("game {} failed: {}", game_id, error);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording observer shared by the unit tests.

    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingObserver {
        pub retries: Mutex<Vec<RetryEvent>>,
        pub responses: Mutex<Vec<ResponseSummary>>,
        pub decisions: Mutex<Vec<(u32, Action)>>,
        pub finished: Mutex<Vec<GameResult>>,
        pub failures: Mutex<Vec<ErrorKind>>,
    }

    impl GameObserver for RecordingObserver {
        fn on_response(&self, summary: &ResponseSummary) {
            self.responses.lock().unwrap().push(summary.clone());
        }

        fn on_retry(&self, event: &RetryEvent) {
            self.retries.lock().unwrap().push(event.clone());
        }

        fn on_decision(&self, _game_id: &str, observation: &Observation, action: &Action) {
            self.decisions
                .lock()
                .unwrap()
                .push((observation.turn, action.clone()));
        }

        fn on_finish(&self, result: &GameResult) {
            self.finished.lock().unwrap().push(result.clone());
        }

        fn on_failure(&self, _game_id: &str, error: &ClientError) {
            self.failures.lock().unwrap().push(error.kind());
        }
    }
}
