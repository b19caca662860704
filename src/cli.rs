// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Subcommands:
// - parse:  show what a reference string resolves to (no network)
// - fetch:  download and print the code for one reference
// - render: fill in every `reference` code block of a Markdown/MDX file
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "reference-codeblock",
    version = "0.1.0",
    about = "Render code blocks from GitHub file references",
    long_about = "reference-codeblock turns GitHub blob URLs such as \
                  https://github.com/org/repo/blob/main/src/lib.rs#L10-L20 into code blocks \
                  holding the referenced lines, with a link back to the source."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug logs on stderr (RUST_LOG overrides this)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 10)]
    pub timeout: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the raw URL, line range and display options of a reference
    ///
    /// Example: reference-codeblock parse "https://github.com/org/repo/blob/main/a.rs#L5-L9"
    Parse {
        /// GitHub blob URL, optionally with #L<start>-L<end> and query options
        reference: String,

        /// Output results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Fetch the referenced lines and print them without common indentation
    ///
    /// Example: reference-codeblock fetch "https://github.com/org/repo/blob/main/a.rs#L5-L9"
    Fetch {
        /// GitHub blob URL, optionally with #L<start>-L<end> and query options
        reference: String,

        /// Print the whole rendered block (code, title, link) as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace `reference` code blocks in a Markdown/MDX file with fetched code
    ///
    /// Example: reference-codeblock render docs/intro.md --output build/intro.md
    Render {
        /// Markdown or MDX file to process
        file: PathBuf,

        /// Where to write the result (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// How many blocks to fetch at the same time
        #[arg(long, default_value_t = 8)]
        concurrency: usize,

        /// Print a per-block JSON report instead of the document
        #[arg(long)]
        json: bool,
    },
}
