//! Headless Chromium implementation of [`BrowserEngine`] using chromiumoxide.

use super::BrowserEngine;
use crate::config::BrowserSettings;
use crate::constants::ENV_CHROMIUM_PATH;
use crate::error::{Result, ScraperError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::fmt::Display;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

fn browser_err(context: &str, e: impl Display) -> ScraperError {
    ScraperError::Browser(format!("{context}: {e}"))
}

// JSON string literals are valid JS string literals.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Explicit executable, if any. Otherwise chromiumoxide searches the usual locations.
pub fn find_chromium(settings: &BrowserSettings) -> Option<PathBuf> {
    let configured = settings
        .chromium_path
        .clone()
        .or_else(|| std::env::var(ENV_CHROMIUM_PATH).ok().map(PathBuf::from))?;
    if configured.exists() {
        Some(configured)
    } else {
        warn!("Configured Chromium path does not exist: {}", configured.display());
        None
    }
}

pub struct ChromiumEngine {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
}

impl ChromiumEngine {
    /// Launch a Chromium instance with a single blank page.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = find_chromium(settings) {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| browser_err("failed to build browser config", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| browser_err("failed to launch Chromium", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Chromium handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| browser_err("failed to create page", e))?;

        info!("Chromium launched");
        Ok(Self {
            browser,
            page: Some(page),
            handler,
        })
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::Browser("page already closed".to_string()))
    }

    async fn evaluate_bool(&self, script: String) -> Result<bool> {
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| browser_err("script evaluation failed", e))?;
        result
            .into_value::<bool>()
            .map_err(|e| browser_err("unexpected script result", e))
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn goto(&mut self, url: &str) -> Result<()> {
        let page = self.page()?;
        page.goto(url)
            .await
            .map_err(|e| browser_err("navigation failed", e))?;
        Ok(())
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|e| browser_err(&format!("'{selector}' not found"), e))?;
        element
            .click()
            .await
            .map_err(|e| browser_err("focus failed", e))?;
        element
            .type_str(text)
            .await
            .map_err(|e| browser_err("typing failed", e))?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|e| browser_err(&format!("'{selector}' not found"), e))?;
        element
            .click()
            .await
            .map_err(|e| browser_err("click failed", e))?;
        Ok(())
    }

    async fn click_link_with_text(&mut self, selector: &str, text: &str) -> Result<bool> {
        let script = format!(
            "(() => {{ const link = Array.from(document.querySelectorAll({sel})).find(a => a.textContent.includes({txt})); if (link) {{ link.click(); return true; }} return false; }})()",
            sel = js_string(selector),
            txt = js_string(text),
        );
        self.evaluate_bool(script).await
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        self.evaluate_bool(script).await
    }

    async fn run_script(&mut self, script: &str) -> Result<()> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(|e| browser_err("script evaluation failed", e))?;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| browser_err("failed to read page content", e))
    }

    async fn go_back(&mut self) -> Result<()> {
        let page = self.page()?;
        page.evaluate("history.back()")
            .await
            .map_err(|e| browser_err("history.back failed", e))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| browser_err("navigation back failed", e))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Page close failed: {}", e);
            }
        }
        let result = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for Chromium to exit failed: {}", e);
        }
        self.handler.abort();
        result
            .map(|_| ())
            .map_err(|e| browser_err("failed to close Chromium", e))
    }
}
