//! Result-list extraction.
//!
//! Walks the paginated result table, reading the primary fields of every row
//! and following the "next page" control until it disappears.

use crate::browser::{Locator, Page};
use crate::cnki::Timings;
use crate::error::Result;
use crate::probe::{Probe, Strategy};
use crate::record::{normalize_date, ListEntry};
use tracing::{debug, info, warn};

/// Container that appears once search results have rendered
pub const RESULTS_CONTAINER: &str = ".result-table-list";

/// One `<tr>` per result
pub const RESULT_ROWS: &str = "table.result-table-list tbody tr";

const TITLE: Probe = Probe(&[Strategy::Css("td.name a.fz14"), Strategy::Css("td.name a")]);
const AUTHORS: Probe = Probe(&[Strategy::Css("td.author")]);
const SOURCE: Probe = Probe(&[Strategy::Css("td.source")]);
const DATE: Probe = Probe(&[Strategy::Css("td.date")]);
const DATABASE: Probe = Probe(&[Strategy::Css("td.data span")]);
const CITATIONS: Probe = Probe(&[Strategy::Css("td.quote a.quoteCnt")]);
const DOWNLOADS: Probe = Probe(&[Strategy::Css("td.download a.downloadCnt")]);

const NEXT_PAGE: Probe = Probe(&[
    Strategy::Css("#PageNext"),
    Strategy::Css("a.pagesnums[title*='下一页']"),
    Strategy::Css("a[title*='下一页']"),
]);

/// Why the page loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// No enabled "next page" control
    LastPage,
    /// A page rendered with zero rows
    NoRows,
    /// The results container never appeared
    RenderTimeout,
    /// Reading a page failed before its rows were processed
    PageError(String),
    /// Probing or clicking the "next page" control failed
    PaginationFailed(String),
}

/// Everything collected from the result list
#[derive(Debug, Clone)]
pub struct Listing {
    pub entries: Vec<ListEntry>,
    /// Pages visited, including the one the loop stopped on
    pub pages: usize,
    pub stop: StopReason,
}

/// Collect the entries of every result page, in page-then-row order.
///
/// Never fails: page-level problems end the loop and keep what was gathered.
pub async fn collect_entries(page: &dyn Page, timings: &Timings) -> Listing {
    let mut entries = Vec::new();
    let mut current_page = 1;

    let stop = loop {
        info!(page = current_page, "Scraping result page");

        if let Err(e) = page
            .wait_for(&Locator::css(RESULTS_CONTAINER), timings.results_timeout)
            .await
        {
            warn!(page = current_page, error = %e, "Results did not render");
            break StopReason::RenderTimeout;
        }
        tokio::time::sleep(timings.list_settle).await;

        match scrape_rows(page, current_page).await {
            Ok(None) => {
                info!(page = current_page, "No rows on page, assuming end of results");
                break StopReason::NoRows;
            }
            Ok(Some(rows)) => entries.extend(rows),
            Err(e) => {
                warn!(page = current_page, error = %e, "Failed to read result page");
                break StopReason::PageError(e.to_string());
            }
        }

        match next_page(page).await {
            Ok(Some(next)) => {
                info!(page = current_page + 1, "Turning to next page");
                if let Err(e) = page.click(&next).await {
                    warn!(error = %e, "Failed to turn page");
                    break StopReason::PaginationFailed(e.to_string());
                }
                tokio::time::sleep(timings.next_page_settle).await;
                current_page += 1;
            }
            Ok(None) => {
                info!("No more pages");
                break StopReason::LastPage;
            }
            Err(e) => {
                warn!(error = %e, "Failed to probe pagination");
                break StopReason::PaginationFailed(e.to_string());
            }
        }
    };

    info!(total = entries.len(), pages = current_page, stop = ?stop, "Result list collected");
    Listing {
        entries,
        pages: current_page,
        stop,
    }
}

/// Entries on the current page, or `None` if the page has no rows at all.
///
/// Rows that fail or have no title are skipped.
async fn scrape_rows(page: &dyn Page, page_no: usize) -> Result<Option<Vec<ListEntry>>> {
    let rows = Locator::css(RESULT_ROWS);
    let count = page.count(&rows).await?;
    info!(page = page_no, count = count, "Found result rows");
    if count == 0 {
        return Ok(None);
    }

    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        match extract_row(page, &rows.clone().nth(i)).await {
            Ok(Some(entry)) => {
                debug!(
                    row = i + 1,
                    title = %entry.title.chars().take(50).collect::<String>(),
                    "Row extracted"
                );
                entries.push(entry);
            }
            Ok(None) => {}
            Err(e) => warn!(page = page_no, row = i + 1, error = %e, "Failed to extract row"),
        }
    }
    Ok(Some(entries))
}

/// Primary fields of one row, or `None` if the row has no title.
pub async fn extract_row(page: &dyn Page, row: &Locator) -> Result<Option<ListEntry>> {
    let Some((title_locator, title)) = TITLE.find(page, Some(row)).await? else {
        return Ok(None);
    };
    let detail_link = page
        .attribute(&title_locator, "href")
        .await?
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty());

    Ok(Some(ListEntry {
        title,
        detail_link,
        authors: AUTHORS.text(page, Some(row)).await?,
        source: SOURCE.text(page, Some(row)).await?,
        date: normalize_date(&DATE.text(page, Some(row)).await?),
        database: DATABASE.text(page, Some(row)).await?,
        citations: CITATIONS.text_or(page, Some(row), "0").await?,
        downloads: DOWNLOADS.text_or(page, Some(row), "0").await?,
    }))
}

/// The enabled "next page" control, if any
async fn next_page(page: &dyn Page) -> Result<Option<Locator>> {
    let Some(locator) = NEXT_PAGE.first_present(page, None).await? else {
        return Ok(None);
    };
    if page.is_enabled(&locator).await? {
        Ok(Some(locator))
    } else {
        Ok(None)
    }
}
