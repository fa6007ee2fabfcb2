//! rustcnki - CNKI literature search scraper
//!
//! Searches CNKI with a professional-search formula, exports every result to
//! CSV as it is scraped, and optionally turns an export into an LLM-written
//! HTML analysis report.
//!
//! ## Usage
//!
//! ```bash
//! rustcnki search --author 张三 --affiliation 北京大学
//! rustcnki search "SU='边坡' AND FT='降雨'" --output papers.csv
//! rustcnki analyze --input papers.csv
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rustcnki::browser::chromium::{ChromiumBrowser, LaunchOptions};
use rustcnki::cnki::{self, Hold, SearchOptions};
use rustcnki::formula;
use rustcnki::llm_report::{self, LlmConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// CNKI literature search scraper
#[derive(Parser)]
#[command(name = "rustcnki")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search CNKI and export results to CSV
    Search {
        /// Professional-search formula, e.g. "AU='张三' AND AF='北京大学'"
        query: Option<String>,

        /// Author name (AU), used when no formula is given
        #[arg(short = 'a', long)]
        author: Option<String>,

        /// Author affiliation (AF), used when no formula is given
        #[arg(short = 'f', long)]
        affiliation: Option<String>,

        /// Output CSV path (default: cnki_papers_<timestamp>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Chrome/Chromium executable
        #[arg(long, env = "CNKI_CHROME_PATH")]
        chrome: Option<PathBuf>,

        /// Keep the browser open until Enter is pressed
        #[arg(long)]
        hold: bool,
    },

    /// Generate an HTML analysis report from an exported CSV
    Analyze {
        /// Input CSV exported by `search`
        #[arg(short, long)]
        input: PathBuf,

        /// Output HTML path (default: analysis_report_<timestamp>.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// API key for the OpenAI-compatible endpoint
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// OpenAI-compatible API base URL
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Model name
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Search {
            query,
            author,
            affiliation,
            output,
            headless,
            chrome,
            hold,
        } => run_search(query, author, affiliation, output, headless, chrome, hold).await,
        Commands::Analyze {
            input,
            output,
            api_key,
            base_url,
            model,
        } => run_analyze(input, output, api_key, base_url, model).await,
    }
}

// ============================================================================
// Search
// ============================================================================

async fn run_search(
    query: Option<String>,
    author: Option<String>,
    affiliation: Option<String>,
    output: Option<PathBuf>,
    headless: bool,
    chrome: Option<PathBuf>,
    hold: bool,
) -> Result<()> {
    let query = formula::resolve(query.as_deref(), author.as_deref(), affiliation.as_deref())?;
    println!("Search formula: {}", query);

    let launch = LaunchOptions {
        headless,
        chrome_executable: chrome,
        ..Default::default()
    };
    let browser = ChromiumBrowser::launch(&launch)
        .await
        .context("Failed to launch browser")?;

    let hold = hold.then(|| -> Hold { Box::new(wait_for_enter) });

    let options = SearchOptions {
        output,
        ..Default::default()
    };

    let summary = cnki::search(Box::new(browser), &query, &options, hold).await?;
    info!(stop = ?summary.stop, "Result list finished");

    if summary.listed == 0 {
        println!("No papers found, check the search formula.");
    }
    println!(
        "\n✓ Saved {} / {} papers to {}",
        summary.written,
        summary.listed,
        summary.output.display()
    );
    Ok(())
}

/// Completion signal sent when Enter is pressed
fn wait_for_enter() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    println!("Scraping finished. Press Enter to close the browser.");
    // Detached thread: runtime shutdown must never wait on stdin
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = tx.send(());
    });
    rx
}

// ============================================================================
// Analyze
// ============================================================================

async fn run_analyze(
    input: PathBuf,
    output: Option<PathBuf>,
    api_key: Option<String>,
    base_url: String,
    model: String,
) -> Result<()> {
    let api_key = api_key.context("No API key; pass --api-key or set GEMINI_API_KEY")?;
    let config = LlmConfig {
        base_url,
        model,
        ..LlmConfig::new(api_key)
    };

    println!("Input file: {}", input.display());
    println!("Endpoint:   {}", config.base_url);
    println!("Model:      {}", config.model);

    let report = llm_report::analyze_file(&config, &input, output.as_deref())
        .await
        .context("Analysis failed")?;

    println!("\n✓ Report saved to: {}", report.display());
    Ok(())
}
