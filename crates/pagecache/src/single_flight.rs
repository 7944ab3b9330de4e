//! Optional de-duplication of concurrent fetches for the same URL
//!
//! The cache core deliberately allows same-URL stampedes: two callers that
//! both miss will both fetch. Wrapping the fetcher in [`SingleFlight`]
//! collapses concurrent fetches for one URL into a single request whose
//! result every waiting caller shares. Counting and cache-write behavior
//! are unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};

use crate::error::{Error, Result};
use crate::fetch::Fetcher;

/// A fetch outcome that can be cloned to every waiter. Only `Error::Fetch`
/// carries through losslessly; other failures collapse to their message.
type FlightOutcome = std::result::Result<Vec<u8>, (Option<u16>, String)>;

type Flight = Arc<OnceCell<FlightOutcome>>;

/// Fetcher decorator sharing one in-flight fetch per URL
pub struct SingleFlight {
    inner: Arc<dyn Fetcher>,
    inflight: Mutex<HashMap<String, Flight>>,
}

impl SingleFlight {
    /// Wrap `inner` with per-URL fetch de-duplication
    pub fn new(inner: Arc<dyn Fetcher>) -> Self {
        Self {
            inner,
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Fetcher for SingleFlight {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let flight = {
            let mut inflight = self.inflight.lock().await;
            inflight.entry(url.to_string()).or_default().clone()
        };

        let outcome = flight
            .get_or_init(|| async {
                match self.inner.fetch(url).await {
                    Ok(content) => Ok(content),
                    Err(Error::Fetch { status, message }) => Err((status, message)),
                    Err(other) => Err((None, other.to_string())),
                }
            })
            .await
            .clone();

        // Retire the flight so a later miss fetches fresh content
        {
            let mut inflight = self.inflight.lock().await;
            if let Some(current) = inflight.get(url) {
                if Arc::ptr_eq(current, &flight) {
                    inflight.remove(url);
                }
            }
        }

        outcome.map_err(|(status, message)| Error::Fetch { status, message })
    }
}
