//! Greyhound customer portal client.
//!
//! The portal has no API. Logging in is a Django form post guarded by a CSRF
//! cookie; the pickup history is embedded as JSON in a chart script on the
//! collection history page.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};
use ureq::Agent;

use super::parser::extract_pickups;
use super::{FetchError, SnapshotSource};
use crate::snapshot::Snapshot;

const DEFAULT_BASE_URL: &str = "https://app.greyhound.ie";
const HISTORY_PATH: &str = "/collection/collection_history/green/";
const CSRF_COOKIE: &str = "csrftoken";
const SESSION_COOKIE: &str = "sessionid";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Scraping client for one Greyhound account
pub struct GreyhoundClient {
    agent: Agent,
    base_url: String,
    account_number: String,
    pin: String,
    logged_in: bool,
}

impl fmt::Debug for GreyhoundClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreyhoundClient")
            .field("base_url", &self.base_url)
            .field("account_number", &self.account_number)
            .field("pin", &"<redacted>")
            .field("logged_in", &self.logged_in)
            .finish()
    }
}

impl GreyhoundClient {
    pub fn new(account_number: impl Into<String>, pin: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();

        Self {
            agent,
            base_url: DEFAULT_BASE_URL.to_string(),
            account_number: account_number.into(),
            pin: pin.into(),
            logged_in: false,
        }
    }

    /// Point the client at a different portal host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Obtain a session cookie from the portal
    pub fn login(&mut self) -> Result<(), FetchError> {
        self.logged_in = false;
        self.agent.cookie_jar_lock().clear();

        let root = format!("{}/", self.base_url);

        // The login form is CSRF protected; loading it sets the token cookie
        self.agent
            .get(&root)
            .call()
            .map_err(|e| FetchError::http(&root, e))?;
        let csrf_token = self
            .cookie(CSRF_COOKIE)
            .ok_or_else(|| FetchError::LoginFailed("portal did not issue a CSRF token".into()))?;

        // Without the referer header the post is silently rejected
        self.agent
            .post(&root)
            .header("referer", root.as_str())
            .send_form([
                ("customerNo", self.account_number.as_str()),
                ("pinCode", self.pin.as_str()),
                ("csrfmiddlewaretoken", csrf_token.as_str()),
            ])
            .map_err(|e| FetchError::http(&root, e))?;

        if self.cookie(SESSION_COOKIE).is_none() {
            return Err(FetchError::LoginFailed(format!(
                "no session issued for account {}",
                self.account_number
            )));
        }

        self.logged_in = true;
        info!("Logged in to {} as {}", self.base_url, self.account_number);
        Ok(())
    }

    /// Scrape the full pickup history for the logged-in account
    pub fn get_data(&self) -> Result<Snapshot, FetchError> {
        if self.cookie(SESSION_COOKIE).is_none() {
            return Err(FetchError::NoSession);
        }

        let url = format!("{}{}", self.base_url, HISTORY_PATH);
        let mut response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| FetchError::http(&url, e))?;
        let html = response
            .body_mut()
            .read_to_string()
            .map_err(|e| FetchError::http(&url, e))?;

        let rows = extract_pickups(&html)?;
        debug!("Scraped {} pickup rows", rows.len());

        Ok(Snapshot::from_entries(rows)?)
    }

    fn cookie(&self, name: &str) -> Option<String> {
        let jar = self.agent.cookie_jar_lock();
        let value = jar
            .iter()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string());
        value
    }
}

impl SnapshotSource for GreyhoundClient {
    /// Logs in on first use. A page without pickup data usually means the
    /// session expired and the portal served its login form, so the session
    /// is dropped and the next fetch logs in again.
    fn fetch(&mut self) -> Result<Snapshot, FetchError> {
        if !self.logged_in {
            self.login()?;
        }

        match self.get_data() {
            Err(e @ (FetchError::MissingData | FetchError::NoSession)) => {
                warn!("Dropping portal session after failed fetch: {}", e);
                self.logged_in = false;
                Err(e)
            }
            other => other,
        }
    }
}
