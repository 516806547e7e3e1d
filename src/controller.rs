//! Lookup session state and the transitions between its view states.
//!
//! The controller owns the query, the loading flag, the last error and the last
//! result. Callers mutate it only through [`LookupController::update_query`],
//! [`LookupController::submit`] and [`LookupController::clear`], or the split
//! [`begin_submit`](LookupController::begin_submit) /
//! [`finish_submit`](LookupController::finish_submit) pair when the controller is
//! shared and must not stay locked across the network call.

use serde::Serialize;

use crate::geocoder::{GeocodeError, Geocoder};
use crate::types::LocationResult;

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a postal code.";
pub const INVALID_POSTAL_CODE_MESSAGE: &str = "Invalid postal code. Please enter a valid one.";
pub const FETCH_FAILED_MESSAGE: &str = "Error fetching location information. Please try again.";

/// User-facing lookup failure. `Display` is the exact message shown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Submit with an empty query; no request was made
    #[error("{}", EMPTY_QUERY_MESSAGE)]
    Validation,

    /// Anything that went wrong during or after the request
    #[error("{0}")]
    Lookup(String),
}

impl From<GeocodeError> for LookupError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::Status(_) => LookupError::Lookup(INVALID_POSTAL_CODE_MESSAGE.to_string()),
            GeocodeError::Transport(msg) | GeocodeError::Parse(msg) => {
                if msg.trim().is_empty() {
                    LookupError::Lookup(FETCH_FAILED_MESSAGE.to_string())
                } else {
                    LookupError::Lookup(msg)
                }
            }
        }
    }
}

/// Derived render state. Never stored; see [`LookupController::view_state`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ViewState<'a> {
    Idle,
    Loading,
    Error(&'a str),
    Success(&'a LocationResult),
}

/// Ticket for a dispatched lookup.
///
/// Only the ticket with the latest sequence number may change the session;
/// older ones are discarded on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct PendingLookup {
    pub seq: u64,
    pub postal_code: String,
}

#[derive(Debug, Default, Clone)]
pub struct LookupController {
    postal_code: String,
    location: Option<LocationResult>,
    error: Option<String>,
    loading: bool,
    latest_seq: u64,
}

impl LookupController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.postal_code
    }

    pub fn location(&self) -> Option<&LocationResult> {
        self.location.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn view_state(&self) -> ViewState<'_> {
        if self.loading {
            ViewState::Loading
        } else if let Some(ref error) = self.error {
            ViewState::Error(error)
        } else if let Some(ref location) = self.location {
            ViewState::Success(location)
        } else {
            ViewState::Idle
        }
    }

    /// Replace the query verbatim
    pub fn update_query(&mut self, raw: impl Into<String>) {
        self.postal_code = raw.into();
    }

    /// Validate the query and enter Loading.
    ///
    /// An empty query records the validation error in place of any previous
    /// result and returns it without touching the loading flag.
    pub fn begin_submit(&mut self) -> Result<PendingLookup, LookupError> {
        if self.postal_code.is_empty() {
            let err = LookupError::Validation;
            self.location = None;
            self.error = Some(err.to_string());
            return Err(err);
        }

        self.latest_seq += 1;
        self.loading = true;
        tracing::info!(seq = self.latest_seq, "Looking up postal code {}", self.postal_code);

        Ok(PendingLookup {
            seq: self.latest_seq,
            postal_code: self.postal_code.clone(),
        })
    }

    /// Apply the outcome of a dispatched lookup.
    ///
    /// Returns `None` when a newer submit (or a clear) superseded `pending`; the
    /// session is left untouched in that case.
    pub fn finish_submit(
        &mut self,
        pending: PendingLookup,
        outcome: Result<LocationResult, GeocodeError>,
    ) -> Option<Result<(), LookupError>> {
        if pending.seq != self.latest_seq {
            tracing::debug!(
                seq = pending.seq,
                latest = self.latest_seq,
                "Discarding stale response for {}",
                pending.postal_code
            );
            return None;
        }

        self.loading = false;

        match outcome {
            Ok(location) => {
                tracing::debug!("Resolved {} to {}", pending.postal_code, location.country);
                self.location = Some(location);
                self.error = None;
                Some(Ok(()))
            }
            Err(err) => {
                tracing::warn!("Lookup for {} failed: {}", pending.postal_code, err);
                let err = LookupError::from(err);
                self.location = None;
                self.error = Some(err.to_string());
                Some(Err(err))
            }
        }
    }

    /// Look up the current query and apply the result
    pub async fn submit<G>(&mut self, geocoder: &G) -> Result<(), LookupError>
    where
        G: Geocoder + ?Sized,
    {
        let pending = self.begin_submit()?;
        let outcome = geocoder.lookup(&pending.postal_code).await;
        // `&mut self` is held across the await, so nothing can supersede this ticket
        self.finish_submit(pending, outcome)
            .unwrap_or(Err(LookupError::Lookup(FETCH_FAILED_MESSAGE.to_string())))
    }

    /// Reset to Idle. In-flight lookups are invalidated.
    pub fn clear(&mut self) {
        self.postal_code.clear();
        self.location = None;
        self.error = None;
        self.loading = false;
        self.latest_seq += 1;
    }
}
