// src/render/mod.rs
// =============================================================================
// This module produces what gets displayed: a single rendered block, or a
// whole Markdown document with its reference blocks filled in.
//
// Submodules:
// - block: one reference string -> code, title and link
// - markdown: every `reference` code block in a document
// =============================================================================

mod block;
mod markdown;

pub use block::ReferenceBlock;
pub use markdown::{render_document, BlockReport};
