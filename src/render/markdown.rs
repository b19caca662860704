// src/render/markdown.rs
// =============================================================================
// This module fills in `reference` code blocks inside a Markdown/MDX document.
//
// A reference block is a fenced code block whose info string contains the
// word "reference" and whose body is a GitHub blob URL:
//
//   ```rust reference
//   https://github.com/org/repo/blob/main/src/lib.rs#L10-L20
//   ```
//
// Each one is replaced with a regular code block holding the fetched code,
// titled with the file path (or ?title=), followed by a link back to GitHub.
// Everything else in the document is copied unchanged.
//
// We use the `pulldown-cmark` crate with source offsets so we know exactly
// which bytes of the document each code block occupies.
//
// Rust concepts:
// - Ranges: byte spans of the document
// - Streams: fetching several blocks at the same time
// =============================================================================

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag};
use reqwest::Client;
use serde::Serialize;
use std::ops::Range;
use tracing::info;

use super::block::{ReferenceBlock, RenderedBlock};

/// Info string word that marks a reference block
pub const REFERENCE_MARKER: &str = "reference";

// Language used when the block doesn't name one
const FALLBACK_LANGUAGE: &str = "text";

// Characters that may open a line nested in lists or blockquotes
const CONTAINER_PREFIX_CHARS: [char; 3] = [' ', '\t', '>'];

// A reference block found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
struct FoundBlock {
    /// Bytes the whole fenced block occupies
    span: Range<usize>,
    /// 1-based line of the opening fence
    line: usize,
    language: Option<String>,
    /// The block body, i.e. the reference string
    source: String,
}

// What happened to one block, for reporting
#[derive(Debug, Clone, Serialize)]
pub struct BlockReport {
    pub line: usize,
    #[serde(flatten)]
    pub rendered: RenderedBlock,
}

impl BlockReport {
    pub fn is_ok(&self) -> bool {
        self.rendered.error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub markdown: String,
    pub blocks: Vec<BlockReport>,
}

// Renders every reference block of a document
//
// Parameters:
//   client: shared HTTP client
//   markdown: the document text
//   concurrency: how many blocks may be fetched at once
//
// Returns an error only if a block's reference can't be parsed; failed
// fetches are reported per block and keep the placeholder code.
pub async fn render_document(
    client: &Client,
    markdown: &str,
    concurrency: usize,
) -> Result<RenderedDocument> {
    let found = find_reference_blocks(markdown);
    info!(blocks = found.len(), "found reference blocks");

    let blocks = found
        .iter()
        .map(|block| {
            ReferenceBlock::new(&block.source)
                .with_context(|| format!("Invalid reference block at line {}", block.line))
        })
        .collect::<Result<Vec<_>>>()?;

    // Each block is its own future; up to `concurrency` run at once
    let futures = blocks.into_iter().enumerate().map(|(index, mut block)| {
        let client = client.clone();
        async move {
            block.load(&client).await;
            (index, block)
        }
    });

    let mut loaded: Vec<(usize, ReferenceBlock)> = stream::iter(futures)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    // buffer_unordered returns blocks as they finish; restore document order
    loaded.sort_by_key(|(index, _)| *index);

    let mut output = String::with_capacity(markdown.len());
    let mut reports = Vec::with_capacity(found.len());
    let mut cursor = 0;

    for (found, (_, block)) in found.iter().zip(&loaded) {
        let rendered = block.render();

        output.push_str(&markdown[cursor..found.span.start]);
        output.push_str(&replacement(markdown, found, &rendered));
        cursor = found.span.end;

        reports.push(BlockReport {
            line: found.line,
            rendered,
        });
    }
    output.push_str(&markdown[cursor..]);

    Ok(RenderedDocument {
        markdown: output,
        blocks: reports,
    })
}

// Finds all fenced code blocks marked with "reference"
fn find_reference_blocks(markdown: &str) -> Vec<FoundBlock> {
    let mut blocks = Vec::new();

    // The block we are currently inside, if it is a reference block
    let mut current: Option<FoundBlock> = None;

    for (event, span) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let words: Vec<&str> = info.split_whitespace().collect();

                if words.contains(&REFERENCE_MARKER) {
                    let language = words
                        .first()
                        .filter(|word| **word != REFERENCE_MARKER)
                        .map(|word| word.to_string());

                    current = Some(FoundBlock {
                        line: markdown[..span.start].matches('\n').count() + 1,
                        span,
                        language,
                        source: String::new(),
                    });
                }
            }

            // Code block text may arrive in several pieces
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.source.push_str(&text);
                }
            }

            Event::End(Tag::CodeBlock(_)) => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }

            _ => {}
        }
    }

    blocks
}

// Builds the text that replaces one reference block
//
// Every line repeats the container prefix of the opening fence (indentation
// and blockquote markers), and the fence is made longer than any backtick run
// in the code.
fn replacement(markdown: &str, found: &FoundBlock, rendered: &RenderedBlock) -> String {
    let line_start = markdown[..found.span.start]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let line = &markdown[line_start..];
    let prefix_len = line.len() - line.trim_start_matches(CONTAINER_PREFIX_CHARS).len();
    let prefix = &markdown[line_start..line_start + prefix_len];

    // Part of the prefix that lies inside the replaced span
    let first_prefix = &prefix[(found.span.start - line_start).min(prefix_len)..];

    let fence = "`".repeat(longest_backtick_run(&rendered.code).max(2) + 1);
    let language = found.language.as_deref().unwrap_or(FALLBACK_LANGUAGE);

    let mut lines = vec![format!("{}{}{}", fence, language, rendered.metastring)];
    lines.extend(rendered.code.split('\n').map(str::to_string));
    lines.push(fence);
    lines.push(String::new());
    lines.push(format!(
        "<div style=\"{}\" class=\"{}\"><a href=\"{}\" target=\"_blank\">{}</a></div>",
        escape_html(&rendered.link.style),
        escape_html(&rendered.link.class_name),
        escape_html(&rendered.link.href),
        escape_html(&rendered.link.text),
    ));

    let separator = format!("\n{}", prefix);
    let mut text = format!("{}{}", first_prefix, lines.join(separator.as_str()));

    // The parsed span usually includes the closing fence's newline
    if markdown[found.span.clone()].ends_with('\n') {
        text.push('\n');
    }

    text
}

fn longest_backtick_run(code: &str) -> usize {
    code.split(|c: char| c != '`').map(str::len).max().unwrap_or(0)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
