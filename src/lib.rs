pub mod browser;
pub mod config;
pub mod constants;
pub mod crawler;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod reconcile;
pub mod service;
pub mod storage;
pub mod students;
pub mod types;

pub use crawler::{CatalogCrawler, CrawlReport};
pub use error::{Result, ScraperError};
pub use reconcile::{Reconciler, UpsertOutcome};
pub use service::CatalogService;
pub use students::{DisciplineSetUpdate, StudentService, StudentUpdate};
pub use types::{Class, Credentials, Discipline, Requirement, Student};
