//! Estimate/authority reconciliation.
//!
//! Every selection change is priced locally for instant feedback and
//! then sent to the backend, whose answer replaces the estimate.  The
//! [`QuoteTracker`] tags each repricing with a generation so that a
//! slow response for an outdated selection can never overwrite the
//! quote for a newer one (last write wins).

use crate::engine::estimate;
use crate::models::{BookingIntent, PriceBreakdown, ServiceCatalog};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Divergences at or below this amount are rounding noise.
const DIVERGENCE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    /// Client-side estimate, provisional.
    Estimate,
    /// Backend calculation, billing grade.
    Authoritative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub breakdown: PriceBreakdown,
    pub source: QuoteSource,
    pub generation: u64,
}

/// Outcome of accepting an authoritative response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub generation: u64,
    pub estimated_total: f64,
    pub authoritative_total: f64,
    /// `authoritative_total - estimated_total`.
    pub divergence: f64,
}

impl Reconciliation {
    pub fn is_significant(&self) -> bool {
        self.divergence.abs() > DIVERGENCE_TOLERANCE
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum QuoteError {
    #[error("response for generation {received} is stale, current generation is {current}")]
    Stale { received: u64, current: u64 },
    #[error("generation {0} has not been issued")]
    Unknown(u64),
    #[error("generation {0} is already authoritative")]
    AlreadySettled(u64),
}

#[derive(Debug, Default)]
pub struct QuoteTracker {
    current: Option<Quote>,
    generation: u64,
}

impl QuoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The quote the UI should render, if anything has been priced.
    pub fn current(&self) -> Option<&Quote> {
        self.current.as_ref()
    }

    /// Price a new selection locally.  Returns the generation the
    /// matching backend request must be tagged with.
    pub fn reprice(&mut self, intent: &BookingIntent, catalog: &ServiceCatalog) -> u64 {
        self.generation += 1;
        let breakdown = estimate(intent, catalog);
        debug!(
            generation = self.generation,
            final_total = breakdown.final_total,
            "estimated quote"
        );
        self.current = Some(Quote {
            breakdown,
            source: QuoteSource::Estimate,
            generation: self.generation,
        });
        self.generation
    }

    /// Replace the estimate with the backend's result for `generation`.
    ///
    /// Responses for superseded generations are rejected and leave the
    /// current quote untouched.
    pub fn apply_authoritative(
        &mut self,
        generation: u64,
        breakdown: PriceBreakdown,
    ) -> Result<Reconciliation, QuoteError> {
        if generation == 0 || generation > self.generation {
            return Err(QuoteError::Unknown(generation));
        }
        if generation < self.generation {
            return Err(QuoteError::Stale {
                received: generation,
                current: self.generation,
            });
        }
        let quote = self
            .current
            .as_mut()
            .ok_or(QuoteError::Unknown(generation))?;
        if quote.source == QuoteSource::Authoritative {
            return Err(QuoteError::AlreadySettled(generation));
        }

        let estimated_total = quote.breakdown.final_total;
        let authoritative_total = breakdown.final_total;
        let reconciliation = Reconciliation {
            generation,
            estimated_total,
            authoritative_total,
            divergence: authoritative_total - estimated_total,
        };
        if reconciliation.is_significant() {
            warn!(
                generation,
                estimated_total,
                authoritative_total,
                "client estimate diverged from authoritative price"
            );
        }
        quote.breakdown = breakdown;
        quote.source = QuoteSource::Authoritative;
        Ok(reconciliation)
    }
}
