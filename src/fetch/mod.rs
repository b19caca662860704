// src/fetch/mod.rs
// =============================================================================
// This module downloads referenced code and tracks the download's state.
//
// Submodules:
// - code: the HTTP fetch, line slicing and indentation stripping
// - state: FetchResult and the reducer that moves it between states
// =============================================================================

mod code;
mod state;

pub use code::fetch_code;
pub use state::{reduce, FetchFailure, FetchMessage, FetchPhase, FetchResult};
