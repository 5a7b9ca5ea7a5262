use super::{BrowserEngine, DomSnapshot};
use crate::config::PortalConfig;
use crate::constants::{
    CATALOG_LIST_SELECTOR, CATALOG_MENU_TEXT, DETAIL_BLOCK_SELECTOR, LOGIN_ID_SELECTOR,
    LOGIN_SECRET_SELECTOR, LOGIN_SUBMIT_SELECTOR, MENU_LINK_SELECTOR,
};
use crate::error::{Result, ScraperError};
use crate::types::Credentials;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

static ENTRY_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("entry id regex"));

/// Where the single browsing session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    LoggedOut,
    AwaitingNav,
    CatalogList,
    EntryDetail,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "init",
            SessionState::LoggedOut => "logged out",
            SessionState::AwaitingNav => "awaiting navigation",
            SessionState::CatalogList => "on the catalog list",
            SessionState::EntryDetail => "on an entry detail",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Timeouts for the page-interaction boundary.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub default: Duration,
    pub detail: Duration,
    pub poll_interval: Duration,
}

impl From<&PortalConfig> for Timeouts {
    fn from(cfg: &PortalConfig) -> Self {
        Self {
            default: Duration::from_millis(cfg.default_timeout_ms),
            detail: Duration::from_millis(cfg.detail_timeout_ms),
            poll_interval: Duration::from_millis(cfg.poll_interval_ms.max(1)),
        }
    }
}

/// Drives one browsing session through the portal's fixed sequence:
///
/// `Init -> open -> LoggedOut -> submit_login -> AwaitingNav -> enter_catalog
/// -> CatalogList -> select_entry -> EntryDetail -> go_back -> CatalogList
/// -> close -> Closed`
///
/// Every step awaits completion before returning; there is exactly one page.
pub struct NavigationDriver {
    engine: Box<dyn BrowserEngine>,
    state: SessionState,
    timeouts: Timeouts,
}

impl fmt::Debug for NavigationDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationDriver")
            .field("engine", &"<Box<dyn BrowserEngine>>")
            .field("state", &self.state)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl NavigationDriver {
    pub fn new(engine: Box<dyn BrowserEngine>, timeouts: Timeouts) -> Self {
        Self {
            engine,
            state: SessionState::Init,
            timeouts,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    fn expect_state(&self, allowed: &[SessionState], action: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ScraperError::InvalidTransition {
                action: action.to_string(),
                state: self.state.to_string(),
            })
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {} -> {}", self.state, next);
        self.state = next;
    }

    #[instrument(skip(self))]
    pub async fn open(&mut self, url: &str) -> Result<()> {
        self.expect_state(&[SessionState::Init], "open")?;
        self.engine.goto(url).await?;
        self.transition(SessionState::LoggedOut);
        Ok(())
    }

    #[instrument(skip(self, credentials), fields(id = %credentials.id))]
    pub async fn submit_login(&mut self, credentials: &Credentials) -> Result<()> {
        self.expect_state(&[SessionState::LoggedOut], "submit login")?;
        self.engine.type_into(LOGIN_ID_SELECTOR, &credentials.id).await?;
        self.engine
            .type_into(LOGIN_SECRET_SELECTOR, &credentials.secret)
            .await?;
        self.engine.click(LOGIN_SUBMIT_SELECTOR).await?;
        self.transition(SessionState::AwaitingNav);
        Ok(())
    }

    /// Waits for the authenticated menu and opens the curriculum list.
    /// Any failure here leaves nothing to enumerate.
    #[instrument(skip(self))]
    pub async fn enter_catalog(&mut self) -> Result<()> {
        self.expect_state(&[SessionState::AwaitingNav], "enter catalog")?;
        self.wait_for_element(MENU_LINK_SELECTOR, self.timeouts.default)
            .await?;
        info!("Logged in, navigating to {}", CATALOG_MENU_TEXT);
        if !self.click_link_by_text(CATALOG_MENU_TEXT).await? {
            return Err(ScraperError::Browser(format!(
                "menu link '{CATALOG_MENU_TEXT}' not found"
            )));
        }
        self.wait_for_element(CATALOG_LIST_SELECTOR, self.timeouts.default)
            .await?;
        self.transition(SessionState::CatalogList);
        Ok(())
    }

    /// Opens the detail view of one catalog entry.
    ///
    /// The session is considered to be on the detail page even when the
    /// detail block never shows up, so callers must still `go_back`.
    #[instrument(skip(self))]
    pub async fn select_entry(&mut self, discipline_id: &str) -> Result<()> {
        self.expect_state(&[SessionState::CatalogList], "select entry")?;
        if !ENTRY_ID_RE.is_match(discipline_id) {
            return Err(ScraperError::Validation(format!(
                "discipline id '{discipline_id}' is not numeric"
            )));
        }
        let script = format!("consultarDisciplina(output, {discipline_id});");
        let result = self.engine.run_script(&script).await;
        self.transition(SessionState::EntryDetail);
        result?;
        self.wait_for_element(DETAIL_BLOCK_SELECTOR, self.timeouts.detail)
            .await
    }

    #[instrument(skip(self))]
    pub async fn go_back(&mut self) -> Result<()> {
        self.expect_state(&[SessionState::EntryDetail], "go back")?;
        self.engine.go_back().await?;
        self.wait_for_element(CATALOG_LIST_SELECTOR, self.timeouts.default)
            .await?;
        self.transition(SessionState::CatalogList);
        Ok(())
    }

    pub async fn click_link_by_text(&mut self, text: &str) -> Result<bool> {
        self.expect_open("click link")?;
        self.engine
            .click_link_with_text(MENU_LINK_SELECTOR, text)
            .await
    }

    /// Polls until `selector` matches or `timeout` elapses.
    pub async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.expect_open("wait for element")?;
        let deadline = Instant::now() + timeout;
        loop {
            match self.engine.has_element(selector).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                // Mid-navigation the page may not answer queries yet
                Err(e) => debug!("Polling '{}' failed: {}", selector, e),
            }
            if Instant::now() >= deadline {
                return Err(ScraperError::Timeout {
                    selector: selector.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.timeouts.poll_interval).await;
        }
    }

    /// Runs a pure extractor over the current DOM.
    pub async fn extract_from_dom<T, F>(&self, extractor: F) -> Result<T>
    where
        F: FnOnce(&DomSnapshot) -> T,
    {
        self.expect_open("extract from DOM")?;
        let html = self.engine.content().await?;
        Ok(extractor(&DomSnapshot::new(html)))
    }

    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        let result = self.engine.close().await;
        self.transition(SessionState::Closed);
        result
    }

    fn expect_open(&self, action: &str) -> Result<()> {
        self.expect_state(
            &[
                SessionState::LoggedOut,
                SessionState::AwaitingNav,
                SessionState::CatalogList,
                SessionState::EntryDetail,
            ],
            action,
        )
    }
}
