//! Ordered selector fallbacks.
//!
//! A [`Probe`] is a list of [`Strategy`] values tried in order; the first one
//! that yields non-empty text wins. Field tables in the extractors are declared
//! as probes instead of nested `if count > 0 { .. } else { .. }` chains.

use crate::browser::{Locator, Page};
use crate::error::Result;

/// One way of locating a field on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// First element matching a CSS selector
    Css(&'static str),
    /// `value` inside the first `container` whose text contains `label`,
    /// e.g. `<li class="top-space"><span>基金：</span><p>..</p></li>`
    Labeled {
        container: &'static str,
        label: &'static str,
        value: &'static str,
    },
}

impl Strategy {
    pub fn locator(&self) -> Locator {
        match *self {
            Strategy::Css(selector) => Locator::css(selector),
            Strategy::Labeled {
                container,
                label,
                value,
            } => Locator::css(container).has_text(label).locate(value),
        }
    }

    /// Locator for this strategy, rooted under `scope` when given
    fn scoped(&self, scope: Option<&Locator>) -> Locator {
        match scope {
            Some(scope) => self.locator().within(scope),
            None => self.locator(),
        }
    }
}

/// Ordered list of strategies for one field.
#[derive(Debug, Clone, Copy)]
pub struct Probe(pub &'static [Strategy]);

impl Probe {
    /// First strategy with non-empty text, with that text trimmed.
    pub async fn find(
        &self,
        page: &dyn Page,
        scope: Option<&Locator>,
    ) -> Result<Option<(Locator, String)>> {
        for strategy in self.0 {
            let locator = strategy.scoped(scope);
            if page.count(&locator).await? == 0 {
                continue;
            }
            let text = page.text(&locator).await?.unwrap_or_default();
            let text = text.trim();
            if !text.is_empty() {
                return Ok(Some((locator, text.to_string())));
            }
        }
        Ok(None)
    }

    /// Text of the first matching strategy, or an empty string.
    pub async fn text(&self, page: &dyn Page, scope: Option<&Locator>) -> Result<String> {
        self.text_or(page, scope, "").await
    }

    /// Text of the first matching strategy, or `default`.
    pub async fn text_or(
        &self,
        page: &dyn Page,
        scope: Option<&Locator>,
        default: &str,
    ) -> Result<String> {
        Ok(self
            .find(page, scope)
            .await?
            .map(|(_, text)| text)
            .unwrap_or_else(|| default.to_string()))
    }

    /// First strategy that matches any element, regardless of its text.
    pub async fn first_present(
        &self,
        page: &dyn Page,
        scope: Option<&Locator>,
    ) -> Result<Option<Locator>> {
        for strategy in self.0 {
            let locator = strategy.scoped(scope);
            if page.count(&locator).await? > 0 {
                return Ok(Some(locator));
            }
        }
        Ok(None)
    }
}
