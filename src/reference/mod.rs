// src/reference/mod.rs
// =============================================================================
// This module understands reference strings: GitHub blob URLs that point at
// the code a block should show.
//
// Submodules:
// - parse: blob URL -> raw-content URL, line range and title
// - customization: query string -> title, link text and link styling
// =============================================================================

mod customization;
mod parse;

pub use customization::{parse_customization, CustomizationOptions};
pub use parse::{parse_reference, LineEnd, Reference};
