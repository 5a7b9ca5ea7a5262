#![allow(dead_code)]

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uerj_scraper::browser::driver::Timeouts;
use uerj_scraper::browser::BrowserEngine;
use uerj_scraper::constants::{LOGIN_SUBMIT_SELECTOR, PORTAL_URL};
use uerj_scraper::storage::{Collection, DocumentStore, InMemoryDocumentStore};
use uerj_scraper::{Result, ScraperError};

pub const CATALOG_IDS: [&str; 10] = [
    "10841", "10842", "10843", "10844", "10845", "10846", "10847", "10848", "10849", "10850",
];

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {path}: {e}"))
}

pub fn fast_timeouts() -> Timeouts {
    Timeouts {
        default: Duration::from_millis(300),
        detail: Duration::from_millis(60),
        poll_interval: Duration::from_millis(5),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Blank,
    Login,
    Menu,
    Catalog,
    Detail,
    // Detail request issued but the page never finishes rendering
    Loading,
    Closed,
}

/// Offline stand-in for the portal: serves fixture pages according to
/// the interactions it receives.
#[derive(Clone)]
pub struct FakeBrowser {
    page: Page,
    stalled_entries: HashSet<String>,
    reject_login: bool,
    back_stalls: bool,
    catalog_fixture: &'static str,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            page: Page::Blank,
            stalled_entries: HashSet::new(),
            reject_login: false,
            back_stalls: false,
            catalog_fixture: "catalog.html",
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Detail pages of these ids never render.
    pub fn stalling_on(mut self, ids: &[&str]) -> Self {
        self.stalled_entries = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// The login form is redisplayed instead of the menu.
    pub fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    /// History back never brings the list back.
    pub fn stalling_on_back(mut self) -> Self {
        self.back_stalls = true;
        self
    }

    /// Serves another catalog list fixture.
    pub fn with_catalog(mut self, fixture_name: &'static str) -> Self {
        self.catalog_fixture = fixture_name;
        self
    }

    /// Shared handle on the interaction log.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn html(&self) -> String {
        match self.page {
            Page::Blank | Page::Closed => "<html><body></body></html>".to_string(),
            Page::Login => fixture("login.html"),
            Page::Menu => fixture("menu.html"),
            Page::Catalog => fixture(self.catalog_fixture),
            Page::Detail => fixture("detail.html"),
            Page::Loading => "<html><body><p>Carregando...</p></body></html>".to_string(),
        }
    }
}

#[async_trait]
impl BrowserEngine for FakeBrowser {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.log(format!("goto {url}"));
        self.page = Page::Login;
        Ok(())
    }

    async fn type_into(&mut self, selector: &str, _text: &str) -> Result<()> {
        self.log(format!("type {selector}"));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.log(format!("click {selector}"));
        if selector == LOGIN_SUBMIT_SELECTOR && !self.reject_login {
            self.page = Page::Menu;
        }
        Ok(())
    }

    async fn click_link_with_text(&mut self, _selector: &str, text: &str) -> Result<bool> {
        self.log(format!("click link {text}"));
        if self.page == Page::Menu && self.html().contains(text) {
            self.page = Page::Catalog;
            return Ok(true);
        }
        Ok(false)
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        let selector = Selector::parse(selector)
            .map_err(|e| ScraperError::Browser(format!("bad selector: {e:?}")))?;
        Ok(Html::parse_document(&self.html()).select(&selector).next().is_some())
    }

    async fn run_script(&mut self, script: &str) -> Result<()> {
        self.log(format!("script {script}"));
        let id: String = script.chars().filter(char::is_ascii_digit).collect();
        self.page = if self.stalled_entries.contains(&id) {
            Page::Loading
        } else {
            Page::Detail
        };
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html())
    }

    async fn go_back(&mut self) -> Result<()> {
        self.log("back".to_string());
        self.page = if self.back_stalls {
            Page::Loading
        } else {
            Page::Catalog
        };
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log("close".to_string());
        self.page = Page::Closed;
        Ok(())
    }
}

/// Store whose writes fail for chosen discipline ids.
#[derive(Clone)]
pub struct FlakyStore {
    inner: InMemoryDocumentStore,
    failing_keys: HashSet<String>,
}

impl FlakyStore {
    pub fn new(inner: InMemoryDocumentStore, failing_keys: &[&str]) -> Self {
        Self {
            inner,
            failing_keys: failing_keys.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.failing_keys.contains(key) {
            Err(ScraperError::persistence(format!("write rejected for {key}")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn find_by_key(&self, collection: Collection, key: &str) -> Result<Option<Value>> {
        self.inner.find_by_key(collection, key).await
    }

    async fn find_all(&self, collection: Collection) -> Result<Vec<Value>> {
        self.inner.find_all(collection).await
    }

    async fn insert_one(&self, collection: Collection, doc: Value) -> Result<()> {
        self.check(&collection.key_of(&doc)?)?;
        self.inner.insert_one(collection, doc).await
    }

    async fn update_one(
        &self,
        collection: Collection,
        key: &str,
        fields: Map<String, Value>,
    ) -> Result<bool> {
        self.check(key)?;
        self.inner.update_one(collection, key, fields).await
    }

    async fn delete_one(&self, collection: Collection, key: &str) -> Result<bool> {
        self.check(key)?;
        self.inner.delete_one(collection, key).await
    }
}

pub fn portal_url() -> &'static str {
    PORTAL_URL
}
