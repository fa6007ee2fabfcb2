//! Detail-page extraction.
//!
//! Secondary fields live on each paper's own page. Extraction is
//! all-or-nothing: if anything fails while reading the page, every secondary
//! field of that paper is left empty.

use crate::browser::{Locator, Page};
use crate::cnki::Timings;
use crate::error::{CnkiError, Result};
use crate::probe::{Probe, Strategy};
use crate::record::PaperDetails;
use tracing::{debug, info, warn};
use url::Url;

const SUMMARY: &str = "#ChDivSummary";
const SUMMARY_MORE: &str = "#ChDivSummaryMore";

/// Labeled `<li class="top-space">` rows of the detail page
const fn labeled(label: &'static str) -> Strategy {
    Strategy::Labeled {
        container: "li.top-space",
        label,
        value: "p",
    }
}

const ABSTRACT: Probe = Probe(&[
    Strategy::Css(SUMMARY),
    Strategy::Css(".abstract-text, .brief"),
]);
const KEYWORDS: Probe = Probe(&[
    Strategy::Css("#ChDivKeyWord"),
    Strategy::Css(".keywords, .keyword"),
]);
const FUNDING: Probe = Probe(&[
    labeled("基金"),
    labeled("资助"),
    Strategy::Css("#ChDivFund"),
]);
const COLLECTION: Probe = Probe(&[labeled("专辑：")]);
const TOPIC: Probe = Probe(&[labeled("专题：")]);
const CLASSIFICATION: Probe = Probe(&[labeled("分类号："), Strategy::Css("#ChDivClassNo")]);
const DOI: Probe = Probe(&[labeled("DOI：")]);

/// Absolute URL for a detail link found in the result list.
///
/// Links that already carry a scheme are used as is; anything else is resolved
/// against `host`.
pub fn resolve_link(host: &Url, link: &str) -> Result<String> {
    if link.starts_with("http") {
        return Ok(link.to_string());
    }
    host.join(link)
        .map(String::from)
        .map_err(|e| CnkiError::Parse(format!("Invalid detail link '{}': {}", link, e)))
}

/// Visit a paper's detail page and read its secondary fields.
///
/// Never fails; on any error the result is [`PaperDetails::default`].
pub async fn extract_details(
    page: &dyn Page,
    host: &Url,
    link: &str,
    timings: &Timings,
) -> PaperDetails {
    match try_extract(page, host, link, timings).await {
        Ok(details) => details,
        Err(e) => {
            warn!(link = %link, error = %e, "Failed to extract paper details");
            PaperDetails::default()
        }
    }
}

async fn try_extract(
    page: &dyn Page,
    host: &Url,
    link: &str,
    timings: &Timings,
) -> Result<PaperDetails> {
    let url = resolve_link(host, link)?;
    debug!(url = %url, "Opening detail page");

    page.goto(&url).await?;
    page.wait_for_load().await?;
    tokio::time::sleep(timings.detail_settle).await;

    expand_abstract(page, timings).await;

    Ok(PaperDetails {
        abstract_text: ABSTRACT.text(page, None).await?,
        keywords: KEYWORDS.text(page, None).await?,
        funding: FUNDING.text(page, None).await?,
        collection: COLLECTION.text(page, None).await?,
        topic: TOPIC.text(page, None).await?,
        classification: CLASSIFICATION.text(page, None).await?,
        doi: DOI.text(page, None).await?,
    })
}

/// Click the abstract's "more" toggle when shown, so the full text is read.
async fn expand_abstract(page: &dyn Page, timings: &Timings) {
    let summary = Locator::css(SUMMARY);
    let more = Locator::css(SUMMARY_MORE);

    let expanded: Result<bool> = async {
        if page.count(&summary).await? == 0
            || page.count(&more).await? == 0
            || !page.is_visible(&more).await?
        {
            return Ok(false);
        }
        info!("Expanding truncated abstract");
        page.click(&more).await?;
        tokio::time::sleep(timings.expand_settle).await;
        Ok(true)
    }
    .await;

    if let Err(e) = expanded {
        warn!(error = %e, "Failed to expand abstract");
    }
}
