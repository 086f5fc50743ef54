//! Snapshot sources: where pickup history comes from.
//!
//! A source restates the full known history on every fetch. The only
//! concrete source is the Greyhound customer portal, which is scraped.

mod greyhound;
mod parser;

use thiserror::Error;

use crate::ledger::DataQualityError;
use crate::snapshot::Snapshot;

pub use greyhound::GreyhoundClient;
pub use parser::extract_pickups;

/// Why a fetch produced no snapshot
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or unexpected HTTP status
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// Credentials rejected: no session cookie was issued
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// Data was requested before logging in
    #[error("tried to fetch bin data on an uninitialised session")]
    NoSession,

    /// The page loaded but held no pickup data
    #[error("couldn't find raw bin data when scraping")]
    MissingData,

    /// The embedded pickup data was not valid JSON
    #[error("failed to decode pickup data: {0}")]
    Decode(#[from] serde_json::Error),

    /// The data decoded but broke the snapshot contract
    #[error(transparent)]
    DataQuality(#[from] DataQualityError),
}

impl FetchError {
    pub(crate) fn http(url: &str, source: ureq::Error) -> Self {
        Self::Http {
            url: url.to_string(),
            source: Box::new(source),
        }
    }

    /// Whether the upstream contract was violated (as opposed to a transient
    /// or authentication problem)
    pub fn is_data_quality(&self) -> bool {
        matches!(self, FetchError::DataQuality(_) | FetchError::Decode(_))
    }
}

/// Anything that can produce a complete pickup snapshot.
///
/// Implementations may block; the poll loop calls them off the async
/// executor's worker budget.
pub trait SnapshotSource: Send {
    fn fetch(&mut self) -> Result<Snapshot, FetchError>;
}

impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    fn fetch(&mut self) -> Result<Snapshot, FetchError> {
        (**self).fetch()
    }
}
