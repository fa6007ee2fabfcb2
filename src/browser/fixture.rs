//! In-memory [`Browser`] over static HTML documents, for tests.
//!
//! Pages are registered as routes keyed by URL. Elements carrying a
//! `data-goto="<url>"` attribute navigate to that route when clicked, and
//! `data-fail` makes a click error. Reading text or attributes of anything
//! inside a `data-read-fail` element errors, and so does counting matches
//! inside a `data-count-fail` element. Visibility honours `hidden` and
//! `display:none`; enablement honours `disabled` and `aria-disabled`.

use super::{poll_until, Browser, Locator, Page};
use crate::error::{CnkiError, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct State {
    routes: HashMap<String, String>,
    current_url: String,
    current_html: String,
    visited: Vec<String>,
    fills: Vec<(String, String)>,
    clicks: Vec<String>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    closed: AtomicBool,
    pages_opened: AtomicUsize,
}

/// Fake browsing session; clones share the same site and state.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    shared: Arc<Shared>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `html` as the document served at `url`
    pub fn route(self, url: &str, html: &str) -> Self {
        self.state()
            .routes
            .insert(url.to_string(), html.to_string());
        self
    }

    /// A page already showing the document at `url`
    pub fn page_at(&self, url: &str) -> FakePage {
        {
            let mut state = self.state();
            let html = state.routes.get(url).cloned().unwrap_or_default();
            state.current_url = url.to_string();
            state.current_html = html;
        }
        FakePage {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.shared.pages_opened.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.state().visited.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.state().fills.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state().clicks.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.shared.state.lock().expect("fixture state poisoned")
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        self.shared.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            shared: Arc::clone(&self.shared),
        }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.shared.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Page of a [`FakeBrowser`]
pub struct FakePage {
    shared: Arc<Shared>,
}

impl FakePage {
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.shared.state.lock().expect("fixture state poisoned")
    }

    fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        let html = state
            .routes
            .get(url)
            .cloned()
            .ok_or_else(|| CnkiError::Browser(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))?;
        state.current_url = url.to_string();
        state.current_html = html;
        state.visited.push(url.to_string());
        Ok(())
    }

    /// Run `f` over the locator's matches in the current document
    fn with_matches<T>(
        &self,
        locator: &Locator,
        f: impl FnOnce(&[ElementRef<'_>]) -> T,
    ) -> Result<T> {
        let html = self.state().current_html.clone();
        let doc = Html::parse_document(&html);
        let found = resolve(&doc, locator)?;
        Ok(f(&found))
    }
}

/// Whether `el` or one of its ancestors carries attribute `flag`
fn flagged(el: &ElementRef<'_>, flag: &str) -> bool {
    std::iter::once(**el)
        .chain(el.ancestors())
        .any(|node| node.value().as_element().is_some_and(|e| e.attr(flag).is_some()))
}

fn read_failure(locator: &Locator) -> CnkiError {
    CnkiError::Browser(format!("Execution context was destroyed reading {}", locator))
}

fn resolve<'a>(doc: &'a Html, locator: &Locator) -> Result<Vec<ElementRef<'a>>> {
    let mut scope = vec![doc.root_element()];
    for step in locator.steps() {
        let selector = Selector::parse(&step.selector)
            .map_err(|e| CnkiError::Parse(format!("{}: {}", step.selector, e)))?;

        let mut found: Vec<ElementRef<'a>> = Vec::new();
        for root in &scope {
            found.extend(root.select(&selector));
        }
        if let Some(text) = &step.has_text {
            found.retain(|e| e.text().collect::<String>().contains(text.as_str()));
        }
        if let Some(n) = step.nth {
            found = found.into_iter().nth(n).into_iter().collect();
        }
        scope = found;
    }
    Ok(scope)
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.navigate(url)
    }

    async fn wait_for_load(&self) -> Result<()> {
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        poll_until(locator, timeout, Duration::from_millis(10), || async move {
            Ok(self.count(locator).await? > 0)
        })
        .await
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.with_matches(locator, |els| {
            if els.iter().any(|e| flagged(e, "data-count-fail")) {
                Err(read_failure(locator))
            } else {
                Ok(els.len())
            }
        })?
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        self.with_matches(locator, |els| match els.first() {
            Some(e) if flagged(e, "data-read-fail") => Err(read_failure(locator)),
            first => Ok(first.map(|e| e.text().collect::<String>())),
        })?
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        self.with_matches(locator, |els| match els.first() {
            Some(e) if flagged(e, "data-read-fail") => Err(read_failure(locator)),
            first => Ok(first.and_then(|e| e.value().attr(name)).map(str::to_string)),
        })?
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let target = self.with_matches(locator, |els| {
            els.first().map(|e| {
                (
                    e.value().attr("data-goto").map(str::to_string),
                    e.value().attr("data-fail").is_some(),
                )
            })
        })?;

        let (goto, fail) =
            target.ok_or_else(|| CnkiError::ElementNotFound(locator.to_string()))?;
        self.state().clicks.push(locator.to_string());
        if fail {
            return Err(CnkiError::Browser(format!("click intercepted on {}", locator)));
        }
        match goto {
            Some(url) => self.navigate(&url),
            None => Ok(()),
        }
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        if self.count(locator).await? == 0 {
            return Err(CnkiError::ElementNotFound(locator.to_string()));
        }
        self.state()
            .fills
            .push((locator.to_string(), value.to_string()));
        Ok(())
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        self.with_matches(locator, |els| {
            els.first().is_some_and(|e| {
                let style: String = e
                    .value()
                    .attr("style")
                    .unwrap_or("")
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                e.value().attr("hidden").is_none() && !style.contains("display:none")
            })
        })
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool> {
        self.with_matches(locator, |els| {
            els.first().is_some_and(|e| {
                e.value().attr("disabled").is_none()
                    && e.value().attr("aria-disabled") != Some("true")
            })
        })
    }
}
