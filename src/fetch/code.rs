// src/fetch/code.rs
// =============================================================================
// This module downloads the referenced file and turns it into display-ready
// code.
//
// Steps:
// 1. GET the raw-content URL (exactly one attempt, no retries)
// 2. Anything but 200 OK is a failure carrying the response body
// 3. Split the body into lines and keep the referenced range
// 4. Remove the indentation shared by every non-empty line
//
// The fetcher reports through a `notify` callback instead of returning a
// value. The caller feeds those messages into the reducer (see state.rs).
//
// Rust concepts:
// - FnMut: a closure that may mutate what it captures
// - Iterators: min() over leading whitespace, map() to strip it
// - char_indices: slicing strings on character boundaries
// =============================================================================

use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use super::state::{FetchFailure, FetchMessage};
use crate::reference::Reference;

const BYTE_ORDER_MARK: char = '\u{feff}';

// Fetches and normalizes the code for one reference
//
// Parameters:
//   client: shared HTTP client
//   reference: where to fetch from and which lines to keep
//   notify: receives exactly one terminal message (Loaded or Error)
//
// Transport errors and non-200 responses are reported through `notify`;
// this function itself cannot fail.
pub async fn fetch_code<F>(client: &Client, reference: &Reference, mut notify: F)
where
    F: FnMut(FetchMessage),
{
    debug!(url = %reference.url, "fetching referenced file");

    let response = match client.get(&reference.url).send().await {
        Ok(response) => response,
        Err(e) => {
            return notify(FetchMessage::Error(FetchFailure::Transport {
                message: e.to_string(),
            }));
        }
    };

    let status = response.status();

    // The body is needed either way: as code, or as the error payload
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            return notify(FetchMessage::Error(FetchFailure::Transport {
                message: e.to_string(),
            }));
        }
    };

    if status != StatusCode::OK {
        return notify(FetchMessage::Error(FetchFailure::Remote {
            status: status.as_u16(),
            body,
        }));
    }

    let lines = select_lines(&body, reference);
    info!(url = %reference.url, lines = lines.len(), "fetched referenced file");

    notify(FetchMessage::Loaded(strip_common_indentation(&lines).join("\n")))
}

// Keeps the referenced lines of a file
//
// Out-of-range bounds are clamped, so a range past the end gives no lines.
pub fn select_lines<'a>(body: &'a str, reference: &Reference) -> Vec<&'a str> {
    let lines: Vec<&str> = body.split('\n').collect();

    let start = reference.from_line.min(lines.len());
    let end = reference.end_index(lines.len()).clamp(start, lines.len());

    lines[start..end].to_vec()
}

// Removes the leading whitespace shared by all non-empty lines
//
// Example:
//   ["  a", "", "    b"] -> ["a", "", "  b"]
//
// Empty lines don't count towards the minimum. A whitespace-only line does.
pub fn strip_common_indentation<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    let indent = lines
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| leading_whitespace(line))
        .min()
        .unwrap_or(0);

    lines.iter().map(|line| skip_chars(line, indent)).collect()
}

// Number of whitespace characters at the start of a line
//
// A byte order mark counts as whitespace too.
fn leading_whitespace(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace() || *c == BYTE_ORDER_MARK)
        .count()
}

// The line without its first `count` characters ("" if it is shorter)
fn skip_chars(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((index, _)) => &line[index..],
        None => "",
    }
}
