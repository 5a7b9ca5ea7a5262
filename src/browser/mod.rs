//! Browser abstraction for the portal crawl.
//!
//! `BrowserEngine` is the external capability ("render a page, interact
//! with it, hand back its DOM"). The crawl never touches it directly; it
//! goes through the [`driver::NavigationDriver`] state machine.

pub mod chromium;
pub mod driver;

use crate::error::Result;
use async_trait::async_trait;
use scraper::Html;

pub use driver::{NavigationDriver, SessionState};

/// A single browser page the crawl drives one step at a time.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Navigate to a URL and wait for the DOM to be ready.
    async fn goto(&mut self, url: &str) -> Result<()>;
    /// Type text into the first element matching `selector`.
    async fn type_into(&mut self, selector: &str, text: &str) -> Result<()>;
    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<()>;
    /// Click the first element matching `selector` whose text contains `text`.
    /// Returns whether such an element was found.
    async fn click_link_with_text(&mut self, selector: &str, text: &str) -> Result<bool>;
    /// Whether at least one element currently matches `selector`.
    async fn has_element(&self, selector: &str) -> Result<bool>;
    /// Run a page script for its side effects (the portal's own JS handlers).
    async fn run_script(&mut self, script: &str) -> Result<()>;
    /// Current serialized DOM.
    async fn content(&self) -> Result<String>;
    /// Browser history back.
    async fn go_back(&mut self) -> Result<()>;
    /// Tear the page and browser down.
    async fn close(&mut self) -> Result<()>;
}

/// Serialized DOM at one point of the navigation.
///
/// Extractors are plain functions of a snapshot, so the same code runs
/// against live pages and fixture HTML.
#[derive(Debug, Clone)]
pub struct DomSnapshot {
    html: String,
}

impl DomSnapshot {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}
