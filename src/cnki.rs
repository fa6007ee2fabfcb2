//! CNKI search session.
//!
//! Drives one browsing session end to end: open the advanced-search page,
//! switch to professional search, submit the formula, collect the result list,
//! then visit each paper and append it to the CSV as soon as it is complete.

use crate::browser::{Browser, Locator, Page};
use crate::detail::extract_details;
use crate::error::{CnkiError, Result};
use crate::listing::{collect_entries, StopReason};
use crate::record::{PaperDetails, PaperRecord};
use crate::writer::RecordWriter;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use url::Url;

/// Advanced search entry point
pub const DEFAULT_ENTRY_URL: &str = "https://kns.cnki.net/kns8s/AdvSearch";

/// Host that relative detail links are resolved against
pub const DEFAULT_HOST: &str = "https://kns.cnki.net";

/// Tab switching the form to professional (formula) search
const MAJOR_SEARCH_TAB: &str = "li[name='majorSearch']";
/// Formula input of the professional search form
const QUERY_INPUT: &str = "textarea.textarea-major.majorSearch.ac_input";
const SEARCH_BUTTON: &str = "input.btn-search";

/// Fixed waits used to let the page settle after each interaction
#[derive(Debug, Clone)]
pub struct Timings {
    /// After opening the search page
    pub startup_settle: Duration,
    /// After switching to professional search
    pub mode_switch_settle: Duration,
    /// After filling the formula
    pub fill_settle: Duration,
    /// After clicking search
    pub search_settle: Duration,
    /// Upper bound for the results table to appear
    pub results_timeout: Duration,
    /// After the results table appeared
    pub list_settle: Duration,
    /// After clicking "next page"
    pub next_page_settle: Duration,
    /// After a detail page loaded
    pub detail_settle: Duration,
    /// After expanding a truncated abstract
    pub expand_settle: Duration,
    /// Between two detail pages
    pub record_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            startup_settle: Duration::from_secs(3),
            mode_switch_settle: Duration::from_secs(1),
            fill_settle: Duration::from_secs(1),
            search_settle: Duration::from_secs(5),
            results_timeout: Duration::from_secs(10),
            list_settle: Duration::from_secs(3),
            next_page_settle: Duration::from_secs(3),
            detail_settle: Duration::from_secs(2),
            expand_settle: Duration::from_secs(1),
            record_delay: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
impl Timings {
    /// No waiting at all
    pub(crate) fn instant() -> Self {
        Self {
            startup_settle: Duration::ZERO,
            mode_switch_settle: Duration::ZERO,
            fill_settle: Duration::ZERO,
            search_settle: Duration::ZERO,
            results_timeout: Duration::ZERO,
            list_settle: Duration::ZERO,
            next_page_settle: Duration::ZERO,
            detail_settle: Duration::ZERO,
            expand_settle: Duration::ZERO,
            record_delay: Duration::ZERO,
        }
    }
}

/// Search session options
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Search page to open
    pub entry_url: String,
    /// Base for relative detail links
    pub host: String,
    /// CSV output path; timestamped default when `None`
    pub output: Option<PathBuf>,
    pub timings: Timings,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            entry_url: DEFAULT_ENTRY_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            output: None,
            timings: Timings::default(),
        }
    }
}

/// Starts waiting for the completion signal.
///
/// Called only once the session reaches the hold point, so nothing listens for
/// the signal while scraping is still running or after a failed run.
pub type Hold = Box<dyn FnOnce() -> oneshot::Receiver<()> + Send>;

/// Outcome of a finished search
#[derive(Debug, Clone)]
pub struct SearchSummary {
    /// CSV file the records were written to
    pub output: PathBuf,
    /// Entries collected from the result list
    pub listed: usize,
    /// Records written to the CSV
    pub written: usize,
    /// Why the result-list loop stopped
    pub stop: StopReason,
}

/// Run a search with `query` and write every result to CSV.
///
/// The browser is closed on every path, including errors. When `hold` is
/// given, it is invoked after a successful scrape and the session waits for
/// the returned signal (or for its sender to drop) before closing, so the
/// browser can be inspected.
///
/// # Errors
///
/// Returns error if the query is empty, the CSV file cannot be created, the
/// formula input is missing, or the session fails before the result list is
/// reached. Records already written stay on disk.
pub async fn search(
    browser: Box<dyn Browser>,
    query: &str,
    options: &SearchOptions,
    hold: Option<Hold>,
) -> Result<SearchSummary> {
    let query = query.trim();
    if query.is_empty() {
        close_browser(browser).await;
        return Err(CnkiError::Validation("No search formula provided".to_string()));
    }
    info!(query = %query, "Starting CNKI search");

    let mut writer = match RecordWriter::create(options.output.as_deref()) {
        Ok(writer) => writer,
        Err(e) => {
            close_browser(browser).await;
            return Err(e);
        }
    };

    let outcome = run_session(browser.as_ref(), query, options, &mut writer, hold).await;
    close_browser(browser).await;

    match outcome {
        Ok((listed, stop)) => {
            info!(
                written = writer.count(),
                path = %writer.path().display(),
                "Search complete"
            );
            Ok(SearchSummary {
                output: writer.path().to_path_buf(),
                listed,
                written: writer.count(),
                stop,
            })
        }
        Err(e) => {
            error!(
                error = %e,
                written = writer.count(),
                path = %writer.path().display(),
                "Search aborted"
            );
            Err(e)
        }
    }
}

async fn close_browser(browser: Box<dyn Browser>) {
    if let Err(e) = browser.close().await {
        warn!(error = %e, "Failed to close browser");
    }
}

/// Session body; returns the number of listed entries and the list stop reason.
async fn run_session(
    browser: &dyn Browser,
    query: &str,
    options: &SearchOptions,
    writer: &mut RecordWriter,
    hold: Option<Hold>,
) -> Result<(usize, StopReason)> {
    let host = Url::parse(&options.host)
        .map_err(|e| CnkiError::Config(format!("Invalid host URL '{}': {}", options.host, e)))?;
    let timings = &options.timings;

    let page = browser.new_page().await?;
    page.goto(&options.entry_url).await?;
    info!(url = %options.entry_url, "Opened search page");
    tokio::time::sleep(timings.startup_settle).await;

    switch_to_professional(page.as_ref(), timings).await;
    submit_query(page.as_ref(), query, timings).await?;

    let listing = collect_entries(page.as_ref(), timings).await;
    let listed = listing.entries.len();
    if listed == 0 {
        info!(stop = ?listing.stop, "No papers found, check the search formula");
        return Ok((0, listing.stop));
    }

    info!(count = listed, "Fetching paper details");
    for (i, entry) in listing.entries.into_iter().enumerate() {
        info!(
            current = i + 1,
            total = listed,
            title = %entry.title.chars().take(50).collect::<String>(),
            "Processing paper"
        );

        let details = match entry.detail_link.as_deref() {
            Some(link) => extract_details(page.as_ref(), &host, link, timings).await,
            None => PaperDetails::default(),
        };

        let record = PaperRecord::from_parts(entry, details);
        if let Err(e) = writer.write(&record) {
            error!(error = %e, title = %record.title, "Failed to write record");
        }

        tokio::time::sleep(timings.record_delay).await;
    }

    if let Some(hold) = hold {
        info!("Waiting for completion signal before closing the browser");
        // A dropped sender releases the hold as well
        let _ = hold().await;
    }

    Ok((listed, listing.stop))
}

/// Best effort: a missing or unclickable tab leaves the default mode.
async fn switch_to_professional(page: &dyn Page, timings: &Timings) {
    let tab = Locator::css(MAJOR_SEARCH_TAB);
    match page.count(&tab).await {
        Ok(0) => info!("Professional search tab not found, keeping current mode"),
        Ok(_) => match page.click(&tab).await {
            Ok(()) => tokio::time::sleep(timings.mode_switch_settle).await,
            Err(e) => warn!(error = %e, "Failed to switch to professional search"),
        },
        Err(e) => warn!(error = %e, "Failed to probe professional search tab"),
    }
}

async fn submit_query(page: &dyn Page, query: &str, timings: &Timings) -> Result<()> {
    let input = Locator::css(QUERY_INPUT);
    if page.count(&input).await? == 0 {
        return Err(CnkiError::ElementNotFound("search formula input".to_string()));
    }

    page.fill(&input, query).await?;
    tokio::time::sleep(timings.fill_settle).await;

    page.click(&Locator::css(SEARCH_BUTTON)).await?;
    info!("Search submitted");
    tokio::time::sleep(timings.search_settle).await;
    Ok(())
}
