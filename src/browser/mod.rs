//! Browser abstraction used by the scraper.
//!
//! [`Browser`] and [`Page`] hide the automation engine (Chromium via
//! chromiumoxide in production). Elements are addressed with [`Locator`]
//! chains rather than handles, so every operation re-resolves against the
//! current DOM.

pub mod chromium;
#[cfg(test)]
pub(crate) mod fixture;

use crate::error::{CnkiError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// One step of a [`Locator`]: a CSS selector evaluated under every element
/// matched by the previous step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub selector: String,
    /// Keep only matches whose text content contains this string
    pub has_text: Option<String>,
    /// Keep only the n-th (0-based) match
    pub nth: Option<usize>,
}

/// A lazily-resolved element query, in the spirit of Playwright locators.
///
/// ```
/// use rustcnki::browser::Locator;
///
/// let title = Locator::css("table.result-table-list tbody tr")
///     .nth(2)
///     .locate("td.name a.fz14");
/// assert_eq!(title.steps().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locator {
    steps: Vec<Step>,
}

impl Locator {
    /// Locator matching `selector` anywhere in the document
    pub fn css(selector: &str) -> Self {
        Self {
            steps: vec![Step {
                selector: selector.to_string(),
                has_text: None,
                nth: None,
            }],
        }
    }

    /// Descend into `selector` under the current matches
    pub fn locate(mut self, selector: &str) -> Self {
        self.steps.push(Step {
            selector: selector.to_string(),
            has_text: None,
            nth: None,
        });
        self
    }

    /// Narrow the last step to its n-th match
    pub fn nth(mut self, index: usize) -> Self {
        if let Some(last) = self.steps.last_mut() {
            last.nth = Some(index);
        }
        self
    }

    /// Narrow the last step to matches whose text contains `text`
    pub fn has_text(mut self, text: &str) -> Self {
        if let Some(last) = self.steps.last_mut() {
            last.has_text = Some(text.to_string());
        }
        self
    }

    /// Re-root this locator under `scope`
    pub fn within(&self, scope: &Locator) -> Self {
        let mut steps = scope.steps.clone();
        steps.extend(self.steps.iter().cloned());
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            f.write_str(&step.selector)?;
            if let Some(text) = &step.has_text {
                write!(f, ":has-text('{}')", text)?;
            }
            if let Some(n) = step.nth {
                write!(f, " >> nth={}", n)?;
            }
        }
        Ok(())
    }
}

/// A single page (tab) of a browsing session.
///
/// Operations that read from an element act on the first match of the
/// locator. Reads return `None` when nothing matches.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> Result<()>;
    /// Wait until the current navigation has finished loading
    async fn wait_for_load(&self) -> Result<()>;
    /// Wait until the locator matches at least one element
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()>;
    /// Number of elements the locator matches
    async fn count(&self, locator: &Locator) -> Result<usize>;
    /// Text content of the first match
    async fn text(&self, locator: &Locator) -> Result<Option<String>>;
    /// Attribute value of the first match
    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;
    /// Click the first match
    async fn click(&self, locator: &Locator) -> Result<()>;
    /// Replace the value of the first matching form control
    async fn fill(&self, locator: &Locator, value: &str) -> Result<()>;
    /// Whether the first match is rendered
    async fn is_visible(&self, locator: &Locator) -> Result<bool>;
    /// Whether the first match accepts interaction
    async fn is_enabled(&self, locator: &Locator) -> Result<bool>;
}

/// A browsing session that can open pages.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a new page in a fresh browsing context
    async fn new_page(&self) -> Result<Box<dyn Page>>;
    /// Shut the session down, releasing the browser process
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Poll `matched` every `interval` until it reports a match or `timeout`
/// elapses.
///
/// An error from `matched` counts as "not yet": the DOM may be mid re-render,
/// and only the deadline ends the wait.
pub(crate) async fn poll_until<F, Fut>(
    locator: &Locator,
    timeout: Duration,
    interval: Duration,
    mut matched: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match matched().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => debug!(locator = %locator, error = %e, "Locator not resolvable yet"),
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(CnkiError::Timeout(locator.to_string()));
        }
        tokio::time::sleep(interval).await;
    }
}
