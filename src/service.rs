//! Catalog surface consumed by the API layer and the CLI.

use crate::browser::chromium::ChromiumEngine;
use crate::browser::driver::Timeouts;
use crate::browser::{BrowserEngine, NavigationDriver};
use crate::config::Config;
use crate::crawler::{CatalogCrawler, CrawlReport};
use crate::error::{Result, ScraperError};
use crate::reconcile::Reconciler;
use crate::storage::{Collection, DocumentStore};
use crate::types::{Credentials, Discipline};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
    config: Config,
    crawl_lock: Mutex<()>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self {
            store,
            config,
            crawl_lock: Mutex::new(()),
        }
    }

    /// Launches headless Chromium and crawls the whole catalog.
    pub async fn scrape_all(&self, credentials: &Credentials) -> Result<Vec<Discipline>> {
        Ok(self.scrape_all_report(credentials).await?.disciplines)
    }

    pub async fn scrape_all_report(&self, credentials: &Credentials) -> Result<CrawlReport> {
        let _guard = self.crawl_lock.try_lock().map_err(|_| {
            warn!("Crawl requested while another one is running");
            ScraperError::CrawlInProgress
        })?;
        let engine = ChromiumEngine::launch(&self.config.browser)
            .await
            .map_err(|e| ScraperError::fatal(format!("browser did not start: {e}")))?;
        self.crawl(Box::new(engine), credentials).await
    }

    /// Crawls with a caller-supplied engine.
    pub async fn scrape_with(
        &self,
        engine: Box<dyn BrowserEngine>,
        credentials: &Credentials,
    ) -> Result<CrawlReport> {
        let _guard = self
            .crawl_lock
            .try_lock()
            .map_err(|_| ScraperError::CrawlInProgress)?;
        self.crawl(engine, credentials).await
    }

    async fn crawl(
        &self,
        engine: Box<dyn BrowserEngine>,
        credentials: &Credentials,
    ) -> Result<CrawlReport> {
        info!("Starting catalog crawl for {}", credentials.id);
        let driver = NavigationDriver::new(engine, Timeouts::from(&self.config.portal));
        let reconciler = Reconciler::new(Arc::clone(&self.store));
        CatalogCrawler::new(driver, reconciler, self.config.portal.url.clone())
            .run(credentials)
            .await
    }

    pub async fn get_all_disciplines(&self) -> Result<Vec<Discipline>> {
        self.store
            .find_all(Collection::Disciplines)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(ScraperError::from))
            .collect()
    }

    pub async fn get_discipline_by_id(&self, id: &str) -> Result<Discipline> {
        let doc = self
            .store
            .find_by_key(Collection::Disciplines, id)
            .await?
            .ok_or_else(|| ScraperError::NotFound {
                entity: Collection::Disciplines.entity(),
                id: id.to_string(),
            })?;
        Ok(serde_json::from_value(doc)?)
    }
}
