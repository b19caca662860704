// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap and set up logging
// 2. Dispatch to the appropriate subcommand handler
// 3. Print results (plain text or JSON)
// 4. Exit with proper code (0 = success, 1 = a fetch failed, 2 = error)
// =============================================================================

mod cli;           // src/cli.rs - command-line parsing
mod fetch;         // src/fetch/ - downloading code and tracking its state
mod logging;       // src/logging.rs - tracing setup
mod reference;     // src/reference/ - reference URL parsing
mod render;        // src/render/ - blocks and documents

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

use cli::{Cli, Commands};
use fetch::FetchPhase;
use reference::{LineEnd, Reference};
use render::{BlockReport, ReferenceBlock};

const USER_AGENT: &str = concat!("reference-codeblock/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 5;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = everything fetched
//   Ok(1) = at least one fetch ended in the error state
//   Err = bad reference, I/O problem, etc.
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Parse { reference, json } => handle_parse(&reference, json),
        Commands::Fetch { reference, json } => {
            let client = build_client(cli.timeout)?;
            handle_fetch(&client, &reference, json).await
        }
        Commands::Render {
            file,
            output,
            concurrency,
            json,
        } => {
            let client = build_client(cli.timeout)?;
            handle_render(&client, &file, output.as_deref(), concurrency, json).await
        }
    }
}

// One client for the whole run so connections are reused
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")
}

// Handles the 'parse' subcommand (no network access)
fn handle_parse(source: &str, json: bool) -> Result<i32> {
    let block = ReferenceBlock::new(source)?;
    let reference = block.reference();
    let customization = block.customization();

    if json {
        let output = serde_json::json!({
            "reference": reference,
            "customization": customization,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(0);
    }

    println!("{:<14} {}", "Raw URL:", reference.url);
    println!("{:<14} {}", "Lines:", describe_lines(reference));
    println!("{:<14} {}", "Title:", block.title());
    println!("{:<14} {}", "Link text:", customization.link_text);
    if customization.use_custom_styling {
        println!("{:<14} class \"{}\"", "Link style:", customization.class_name());
    } else {
        println!("{:<14} {}", "Link style:", customization.note_styling.to_css());
    }

    Ok(0)
}

// Handles the 'fetch' subcommand
async fn handle_fetch(client: &Client, source: &str, json: bool) -> Result<i32> {
    let mut block = ReferenceBlock::new(source)?;
    eprintln!("🔍 Fetching {}", block.reference().url);

    let phase = block.load(client).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&block.render())?);
    } else if let Some(error) = &block.state().error {
        eprintln!("❌ {}", error);
    } else {
        println!("{}", block.state().code);
    }

    Ok(exit_code_for([phase]))
}

// Handles the 'render' subcommand
async fn handle_render(
    client: &Client,
    file: &Path,
    output: Option<&Path>,
    concurrency: usize,
    json: bool,
) -> Result<i32> {
    let markdown = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let document = render::render_document(client, &markdown, concurrency).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&document.blocks)?);
    } else if let Some(path) = output {
        std::fs::write(path, &document.markdown)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    } else {
        print!("{}", document.markdown);
    }

    print_summary(file, &document.blocks);

    Ok(exit_code_for(document.blocks.iter().map(|block| block.rendered.phase)))
}

// Prints a short per-file summary on stderr
fn print_summary(file: &Path, blocks: &[BlockReport]) {
    let failed: Vec<&BlockReport> = blocks.iter().filter(|block| !block.is_ok()).collect();

    for block in &failed {
        if let Some(error) = &block.rendered.error {
            eprintln!("   ❌ line {}: {}", block.line, error);
        }
    }

    eprintln!("📊 {}:", file.display());
    eprintln!("   ✅ Rendered: {}", blocks.len() - failed.len());
    eprintln!("   ❌ Failed: {}", failed.len());
}

fn exit_code_for(phases: impl IntoIterator<Item = FetchPhase>) -> i32 {
    if phases.into_iter().any(|phase| phase == FetchPhase::Failed) {
        1
    } else {
        0
    }
}

// Human-readable, 1-based description of the selected lines
fn describe_lines(reference: &Reference) -> String {
    let first = reference.from_line + 1;
    match reference.to_line {
        LineEnd::EndOfFile if reference.from_line == 0 => "whole file".to_string(),
        LineEnd::EndOfFile => format!("{} to end of file", first),
        LineEnd::Unspecified | LineEnd::Line(0) => format!("{}", first),
        LineEnd::Line(last) => format!("{}-{}", first, last + 1),
    }
}
