//! Chromium-backed [`Browser`] using chromiumoxide.
//!
//! Locator operations are compiled to small JavaScript snippets evaluated in
//! the page; each snippet resolves the locator chain with `querySelectorAll`
//! and returns its answer JSON-encoded.

use super::{poll_until, Browser, Locator, Page};
use crate::error::{CnkiError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Interval between polls while waiting for a selector
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Resolves a serialized locator chain to an array of elements.
const RESOLVE_JS: &str = r#"function (steps) {
  let scope = [document];
  for (const s of steps) {
    let found = [];
    for (const root of scope) found.push(...root.querySelectorAll(s.selector));
    if (s.has_text !== null) found = found.filter(e => (e.textContent || '').includes(s.has_text));
    if (s.nth !== null) found = s.nth < found.length ? [found[s.nth]] : [];
    scope = found;
  }
  return scope;
}"#;

/// Browser launch settings
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Explicit Chrome/Chromium binary; autodetected when `None`
    pub chrome_executable: Option<PathBuf>,
    /// Upper bound for a single navigation
    pub navigation_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_executable: None,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

/// A running Chromium instance.
pub struct ChromiumBrowser {
    browser: CdpBrowser,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromiumBrowser {
    /// Launch Chromium and start its CDP event loop.
    ///
    /// # Errors
    ///
    /// Returns error if no browser binary is found or it fails to start.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(1366, 768)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run");

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| CnkiError::Config(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = CdpBrowser::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    // Newer Chrome builds emit CDP messages chromiumoxide cannot decode
                    debug!(error = %e, "CDP handler error (continuing)");
                }
            }
            debug!("CDP handler finished");
        });

        info!(headless = options.headless, "Browser launched");

        Ok(Self {
            browser,
            handler,
            navigation_timeout: options.navigation_timeout,
        })
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(Box::new(ChromiumPage {
            page,
            navigation_timeout: self.navigation_timeout,
        }))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumBrowser {
            mut browser,
            handler,
            ..
        } = *self;

        if let Err(e) = browser.close().await {
            warn!(error = %e, "Browser close failed");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "Browser process wait failed");
        }
        handler.abort();

        info!("Browser closed");
        Ok(())
    }
}

/// A single Chromium tab.
pub struct ChromiumPage {
    page: chromiumoxide::Page,
    navigation_timeout: Duration,
}

impl ChromiumPage {
    /// Evaluate `body` with the locator's matches bound to `els`.
    ///
    /// `body` must `return JSON.stringify(...)`.
    async fn eval<T: DeserializeOwned>(&self, locator: &Locator, body: &str) -> Result<T> {
        let steps = serde_json::to_string(locator.steps())?;
        let script = format!(
            "(() => {{ const els = ({})({}); {} }})()",
            RESOLVE_JS, steps, body
        );

        let raw: String = self
            .page
            .evaluate(script)
            .await?
            .into_value()
            .map_err(|e| {
                CnkiError::Browser(format!("Unexpected script result for {}: {}", locator, e))
            })?;

        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<()> {
        debug!(url = %url, "Navigating");
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(CnkiError::Timeout(format!("navigation to {}", url))),
        }
    }

    async fn wait_for_load(&self) -> Result<()> {
        match tokio::time::timeout(self.navigation_timeout, self.page.wait_for_navigation()).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(CnkiError::Timeout("page load".to_string())),
        }
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        poll_until(locator, timeout, POLL_INTERVAL, || async move {
            Ok(self.count(locator).await? > 0)
        })
        .await
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.eval(locator, "return JSON.stringify(els.length);").await
    }

    async fn text(&self, locator: &Locator) -> Result<Option<String>> {
        self.eval(
            locator,
            "return JSON.stringify(els.length ? els[0].textContent : null);",
        )
        .await
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let body = format!(
            "return JSON.stringify(els.length ? els[0].getAttribute({}) : null);",
            serde_json::to_string(name)?
        );
        self.eval(locator, &body).await
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let clicked: bool = self
            .eval(
                locator,
                "if (!els.length) return JSON.stringify(false); \
                 els[0].scrollIntoView({block: 'center'}); els[0].click(); \
                 return JSON.stringify(true);",
            )
            .await?;

        if clicked {
            Ok(())
        } else {
            Err(CnkiError::ElementNotFound(locator.to_string()))
        }
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        let body = format!(
            "if (!els.length) return JSON.stringify(false); \
             const el = els[0]; el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{bubbles: true}})); \
             el.dispatchEvent(new Event('change', {{bubbles: true}})); \
             return JSON.stringify(true);",
            serde_json::to_string(value)?
        );
        let filled: bool = self.eval(locator, &body).await?;

        if filled {
            Ok(())
        } else {
            Err(CnkiError::ElementNotFound(locator.to_string()))
        }
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        self.eval(
            locator,
            "if (!els.length) return JSON.stringify(false); \
             const st = getComputedStyle(els[0]); \
             return JSON.stringify(els[0].getClientRects().length > 0 \
               && st.visibility !== 'hidden' && st.display !== 'none');",
        )
        .await
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<bool> {
        self.eval(
            locator,
            "if (!els.length) return JSON.stringify(false); \
             return JSON.stringify(!els[0].disabled \
               && els[0].getAttribute('aria-disabled') !== 'true');",
        )
        .await
    }
}
