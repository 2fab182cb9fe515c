//! Signature validator boundary and trust-list readiness.
//!
//! [`ValidationFacade`] guards an external [`SignatureValidator`]: callers
//! block until the first trust-list load completes (bounded by a wait
//! timeout) instead of validating against an empty trust set. A failed
//! refresh keeps the previously loaded state.

use crate::domain::document::Document;
use crate::domain::validation::{ExistingSignature, ValidationReport};
use crate::infra::error::{SigningError, SigningResult};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// External signature validation and trust-list management.
pub trait SignatureValidator: Send + Sync {
    /// Reload trusted lists.
    ///
    /// # Errors
    /// Download or parse failures.
    fn refresh(&self) -> SigningResult<()>;

    /// Form and container of the signature already on `document`, if any.
    ///
    /// # Errors
    /// Validator failures.
    fn classify_existing_signature(
        &self,
        document: &Document,
    ) -> SigningResult<Option<ExistingSignature>>;

    /// Full validation report, or `None` when the document is unsigned.
    ///
    /// # Errors
    /// Validator failures.
    fn validate_report(&self, document: &Document) -> SigningResult<Option<ValidationReport>>;
}

/// Trust-list cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustListState {
    NotReady,
    Ready { refreshed_at: DateTime<Utc> },
}

pub struct ValidationFacade {
    validator: Arc<dyn SignatureValidator>,
    state: Mutex<TrustListState>,
    ready: Condvar,
    wait_timeout: Duration,
}

impl ValidationFacade {
    #[must_use]
    pub fn new(validator: Arc<dyn SignatureValidator>, wait_timeout: Duration) -> Self {
        Self {
            validator,
            state: Mutex::new(TrustListState::NotReady),
            ready: Condvar::new(),
            wait_timeout,
        }
    }

    #[must_use]
    pub fn state(&self) -> TrustListState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state(), TrustListState::Ready { .. })
    }

    /// Refresh trusted lists through the validator. Wakes waiting readers on
    /// success; on failure the previous state is kept.
    ///
    /// # Errors
    /// The validator's refresh failure.
    pub fn refresh(&self) -> SigningResult<()> {
        log::info!("Refreshing trusted lists");
        match self.validator.refresh() {
            Ok(()) => {
                let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                *state = TrustListState::Ready {
                    refreshed_at: Utc::now(),
                };
                self.ready.notify_all();
                log::info!("Trusted lists loaded");
                Ok(())
            }
            Err(e) => {
                log::warn!("Trusted list refresh failed, keeping previous state: {e}");
                Err(e)
            }
        }
    }

    /// Block until the trust lists are loaded or the wait timeout elapses.
    ///
    /// # Errors
    /// `ValidatorNotReady` on timeout.
    pub fn wait_until_ready(&self) -> SigningResult<()> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (state, timeout) = self
            .ready
            .wait_timeout_while(state, self.wait_timeout, |s| {
                *s == TrustListState::NotReady
            })
            .unwrap_or_else(PoisonError::into_inner);
        if timeout.timed_out() && *state == TrustListState::NotReady {
            return Err(SigningError::ValidatorNotReady(format!(
                "trusted lists not loaded after {}s",
                self.wait_timeout.as_secs()
            )));
        }
        Ok(())
    }
}

impl SignatureValidator for ValidationFacade {
    fn refresh(&self) -> SigningResult<()> {
        ValidationFacade::refresh(self)
    }

    fn classify_existing_signature(
        &self,
        document: &Document,
    ) -> SigningResult<Option<ExistingSignature>> {
        self.wait_until_ready()?;
        self.validator.classify_existing_signature(document)
    }

    fn validate_report(&self, document: &Document) -> SigningResult<Option<ValidationReport>> {
        self.wait_until_ready()?;
        self.validator.validate_report(document)
    }
}

/// Start the periodic trust-list refresh. The first refresh runs
/// immediately; the blocking validator call runs off the async workers.
pub fn spawn_trust_list_refresh(
    facade: Arc<ValidationFacade>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let facade = Arc::clone(&facade);
            match tokio::task::spawn_blocking(move || facade.refresh()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("Scheduled trust list refresh failed: {e}"),
                Err(e) => log::error!("Trust list refresh task panicked: {e}"),
            }
        }
    })
}
