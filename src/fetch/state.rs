// src/fetch/state.rs
// =============================================================================
// This module holds the state of one code block's download and the single
// function allowed to change it.
//
// Lifecycle:
//
//   Idle --loading--> Loading --loaded--> Loaded
//                        |
//                        +----error-----> Failed
//
//   any state --reset--> Idle
//
// Every change goes through `reduce`, a pure function: it takes the current
// state and a message and returns the next state. Nothing else mutates a
// FetchResult.
//
// Rust concepts:
// - Enums: messages, load status and failures are all enums
// - thiserror: derives Display/Error for FetchFailure
// - serde(other): unknown message kinds decode instead of failing
// =============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code shown before anything has been downloaded
pub const PLACEHOLDER_CODE: &str = "loading...";

// Why a fetch failed
//
// Both variants are carried inside the result state; the fetcher never
// returns them as a Rust error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchFailure {
    /// The request could not complete (DNS, connection, timeout, ...)
    #[error("request failed: {message}")]
    Transport { message: String },
    /// The server answered with something other than 200 OK
    #[error("HTTP {status}: {body}")]
    Remote { status: u16, body: String },
}

// The tri-state "loading" flag
//
// NotStarted = never fetched (or reset), InFlight = request pending,
// Settled = a terminal message arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    #[default]
    NotStarted,
    InFlight,
    Settled,
}

// The four observable phases of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    Idle,
    Loading,
    Loaded,
    Failed,
}

// State of one block's download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Code to display; the placeholder until loaded
    pub code: String,
    /// Set when the last attempt failed
    pub error: Option<FetchFailure>,
    pub loading: LoadStatus,
}

impl Default for FetchResult {
    fn default() -> Self {
        FetchResult {
            code: PLACEHOLDER_CODE.to_string(),
            error: None,
            loading: LoadStatus::NotStarted,
        }
    }
}

impl FetchResult {
    pub fn phase(&self) -> FetchPhase {
        match (self.loading, &self.error) {
            (LoadStatus::NotStarted, _) => FetchPhase::Idle,
            (LoadStatus::InFlight, _) => FetchPhase::Loading,
            (LoadStatus::Settled, Some(_)) => FetchPhase::Failed,
            (LoadStatus::Settled, None) => FetchPhase::Loaded,
        }
    }

    // Precondition for starting a fetch
    //
    // Only a block that has never fetched (or was reset) may fetch. A pending
    // or finished attempt must not be re-issued.
    pub fn should_fetch(&self) -> bool {
        self.loading == LoadStatus::NotStarted
    }
}

// Messages accepted by the reducer
//
// On the wire a message looks like {"type": "loaded", "value": "fn main() {}"}.
// Any other "type" becomes Unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FetchMessage {
    Reset,
    Loading,
    Loaded(String),
    Error(FetchFailure),
    #[serde(other)]
    Unknown,
}

// Computes the next state
//
// | message  | next state                                 |
// |----------|--------------------------------------------|
// | reset    | FetchResult::default()                     |
// | loading  | loading = InFlight                         |
// | loaded   | code = payload, loading = Settled          |
// | error    | error = payload, loading = Settled         |
// | unknown  | unchanged                                  |
pub fn reduce(state: &FetchResult, message: FetchMessage) -> FetchResult {
    match message {
        FetchMessage::Reset => FetchResult::default(),
        FetchMessage::Loading => FetchResult {
            loading: LoadStatus::InFlight,
            ..state.clone()
        },
        FetchMessage::Loaded(code) => FetchResult {
            code,
            loading: LoadStatus::Settled,
            ..state.clone()
        },
        FetchMessage::Error(failure) => FetchResult {
            error: Some(failure),
            loading: LoadStatus::Settled,
            ..state.clone()
        },
        FetchMessage::Unknown => state.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_failure() -> FetchFailure {
        FetchFailure::Remote {
            status: 404,
            body: "404: Not Found".to_string(),
        }
    }

    #[test]
    fn test_initial_state_is_idle() {
        let state = FetchResult::default();
        assert_eq!(state.code, PLACEHOLDER_CODE);
        assert_eq!(state.error, None);
        assert_eq!(state.phase(), FetchPhase::Idle);
        assert!(state.should_fetch());
    }

    #[test]
    fn test_happy_path_transitions() {
        let state = reduce(&FetchResult::default(), FetchMessage::Loading);
        assert_eq!(state.phase(), FetchPhase::Loading);
        assert!(!state.should_fetch());

        let state = reduce(&state, FetchMessage::Loaded("fn main() {}".to_string()));
        assert_eq!(state.phase(), FetchPhase::Loaded);
        assert_eq!(state.code, "fn main() {}");
        assert!(!state.should_fetch());
    }

    #[test]
    fn test_loading_keeps_code_and_error() {
        let loaded = reduce(&FetchResult::default(), FetchMessage::Loaded("a".to_string()));
        let state = reduce(&loaded, FetchMessage::Loading);
        assert_eq!(state.loading, LoadStatus::InFlight);
        assert_eq!(state.code, "a");
        assert_eq!(state.error, None);

        let failed = reduce(&FetchResult::default(), FetchMessage::Error(remote_failure()));
        let state = reduce(&failed, FetchMessage::Loading);
        assert_eq!(state.loading, LoadStatus::InFlight);
        assert_eq!(state.code, PLACEHOLDER_CODE);
        assert_eq!(state.error, Some(remote_failure()));
    }

    #[test]
    fn test_error_keeps_placeholder_code() {
        let state = reduce(&FetchResult::default(), FetchMessage::Loading);
        let state = reduce(&state, FetchMessage::Error(remote_failure()));
        assert_eq!(state.phase(), FetchPhase::Failed);
        assert_eq!(state.loading, LoadStatus::Settled);
        assert_eq!(state.code, PLACEHOLDER_CODE);
        assert_eq!(state.error, Some(remote_failure()));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let failed = reduce(&FetchResult::default(), FetchMessage::Error(remote_failure()));
        let once = reduce(&failed, FetchMessage::Reset);
        let twice = reduce(&once, FetchMessage::Reset);
        assert_eq!(once, twice);
        assert_eq!(once, FetchResult::default());
    }

    #[test]
    fn test_unknown_message_is_identity() {
        let state = reduce(&FetchResult::default(), FetchMessage::Loaded("x".to_string()));
        assert_eq!(reduce(&state, FetchMessage::Unknown), state);
    }

    #[test]
    fn test_messages_decode_from_json() {
        let message: FetchMessage =
            serde_json::from_str(r#"{"type": "loaded", "value": "a\nb"}"#).unwrap();
        assert_eq!(message, FetchMessage::Loaded("a\nb".to_string()));

        let message: FetchMessage = serde_json::from_str(r#"{"type": "reset"}"#).unwrap();
        assert_eq!(message, FetchMessage::Reset);

        let message: FetchMessage =
            serde_json::from_str(r#"{"type": "refresh"}"#).unwrap();
        assert_eq!(message, FetchMessage::Unknown);
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(remote_failure().to_string(), "HTTP 404: 404: Not Found");
        let transport = FetchFailure::Transport {
            message: "connection refused".to_string(),
        };
        assert_eq!(transport.to_string(), "request failed: connection refused");
    }
}
