//! Crawl orchestration: one session, every catalog entry, strictly in order.

use crate::browser::{NavigationDriver, SessionState};
use crate::error::{Result, ScraperError};
use crate::metrics::{
    record_crawl, record_discipline_scraped, record_enrichment_failure, record_upsert, UpsertKind,
};
use crate::parser::{extract_catalog_rows, extract_class_blocks, extract_requirements, parse_class};
use crate::reconcile::Reconciler;
use crate::types::{Credentials, Discipline};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Summary of a finished crawl.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub disciplines: Vec<Discipline>,
    /// Disciplines whose detail page was read.
    pub enriched: usize,
    /// Ids whose detail page could not be read; they carry list-level fields only.
    pub enrichment_failures: Vec<String>,
    pub persisted: usize,
    pub failed_writes: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            disciplines: Vec::new(),
            enriched: 0,
            enrichment_failures: Vec::new(),
            persisted: 0,
            failed_writes: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }
}

/// Walks the curriculum catalog and reconciles each entry as it goes.
///
/// A crawler owns its browsing session and is consumed by the crawl.
#[derive(Debug)]
pub struct CatalogCrawler {
    driver: NavigationDriver,
    reconciler: Reconciler,
    portal_url: String,
}

impl CatalogCrawler {
    pub fn new(driver: NavigationDriver, reconciler: Reconciler, portal_url: impl Into<String>) -> Self {
        Self {
            driver,
            reconciler,
            portal_url: portal_url.into(),
        }
    }

    pub async fn scrape_all(self, credentials: &Credentials) -> Result<Vec<Discipline>> {
        Ok(self.run(credentials).await?.disciplines)
    }

    /// Runs the full crawl and closes the session whatever the outcome.
    #[instrument(skip_all, fields(portal = %self.portal_url))]
    pub async fn run(mut self, credentials: &Credentials) -> Result<CrawlReport> {
        let timer = Instant::now();
        let mut report = CrawlReport::new();

        let result = self.crawl(credentials, &mut report).await;
        if let Err(e) = self.driver.close().await {
            warn!("Closing the browsing session failed: {}", e);
        }
        report.finished_at = Utc::now();

        let elapsed = timer.elapsed().as_secs_f64();
        match result {
            Ok(()) => {
                record_crawl("success", elapsed);
                info!(
                    total = report.disciplines.len(),
                    enriched = report.enriched,
                    failures = report.enrichment_failures.len(),
                    failed_writes = report.failed_writes.len(),
                    "Crawl finished in {:.1}s",
                    elapsed
                );
                Ok(report)
            }
            Err(e) => {
                record_crawl("fatal", elapsed);
                error!("Crawl aborted: {}", e);
                Err(e)
            }
        }
    }

    async fn crawl(&mut self, credentials: &Credentials, report: &mut CrawlReport) -> Result<()> {
        self.authenticate(credentials).await?;

        let rows = self
            .driver
            .extract_from_dom(extract_catalog_rows)
            .await
            .map_err(|e| ScraperError::fatal(format!("catalog list could not be read: {e}")))?;
        info!("Found {} disciplines.", rows.len());

        for row in rows {
            let mut discipline = Discipline::from(row);
            record_discipline_scraped();

            let Some(id) = discipline.discipline_id.clone() else {
                debug!("{} has no detail link, keeping list fields only", discipline.label());
                report.disciplines.push(discipline);
                continue;
            };

            match self.enrich(&mut discipline, &id).await {
                Ok(()) => {
                    report.enriched += 1;
                    info!(
                        "Extracted {} classes for discipline {}",
                        discipline.classes.as_ref().map_or(0, Vec::len),
                        discipline.label()
                    );
                }
                Err(e) => {
                    record_enrichment_failure();
                    warn!("{}", e);
                    report.enrichment_failures.push(id.clone());
                }
            }

            match self.reconciler.upsert(&discipline).await {
                Ok(_) => report.persisted += 1,
                Err(e) => {
                    record_upsert(UpsertKind::Failed);
                    error!("Failed to upsert discipline {}: {}", id, e);
                    report.failed_writes.push(id.clone());
                }
            }

            if self.driver.state() == SessionState::EntryDetail {
                self.driver.go_back().await.map_err(|e| {
                    ScraperError::fatal(format!("catalog list did not come back after {id}: {e}"))
                })?;
            }
            report.disciplines.push(discipline);
        }
        Ok(())
    }

    async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        self.login(credentials)
            .await
            .map_err(|e| ScraperError::fatal(format!("login did not reach the catalog: {e}")))
    }

    async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        self.driver.open(&self.portal_url).await?;
        self.driver.submit_login(credentials).await?;
        self.driver.enter_catalog().await
    }

    /// Reads requirements and classes for one entry. Leaves `discipline`
    /// untouched on failure.
    async fn enrich(&mut self, discipline: &mut Discipline, id: &str) -> Result<()> {
        let entry_error = |e: ScraperError| ScraperError::EntryExtraction {
            discipline_id: id.to_string(),
            message: e.to_string(),
        };

        self.driver.select_entry(id).await.map_err(entry_error)?;
        let (requirements, blocks) = self
            .driver
            .extract_from_dom(|snapshot| {
                (extract_requirements(snapshot), extract_class_blocks(snapshot))
            })
            .await
            .map_err(entry_error)?;

        discipline.requirements = Some(requirements);
        discipline.classes = Some(blocks.iter().map(|block| parse_class(block)).collect());
        Ok(())
    }
}
