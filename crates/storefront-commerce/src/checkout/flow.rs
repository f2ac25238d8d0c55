//! Checkout flow state machine.
//!
//! `Idle -> Submitting -> {Success, Failed}`. `Failed` is not a resting
//! state: a failed attempt settles back in `Idle` with the error kept for
//! display, so the customer can retry by hand.

use crate::error::CommerceError;
use crate::ids::OrderId;
use serde::{Deserialize, Serialize};

/// Phases of a checkout attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutPhase {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Finalize request in flight.
    Submitting,
    /// Order placed.
    Success,
    /// Last attempt failed.
    Failed,
}

impl CheckoutPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutPhase::Idle => "idle",
            CheckoutPhase::Submitting => "submitting",
            CheckoutPhase::Success => "success",
            CheckoutPhase::Failed => "failed",
        }
    }
}

/// Checkout flow state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutFlow {
    phase: CheckoutPhase,
    /// Outcome of the last finished attempt (`Success` or `Failed`).
    last_outcome: Option<CheckoutPhase>,
    last_error: Option<String>,
    last_order: Option<OrderId>,
    attempts: u32,
}

impl CheckoutFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    /// Check if a finalize request is in flight.
    pub fn is_submitting(&self) -> bool {
        self.phase == CheckoutPhase::Submitting
    }

    /// Start an attempt. Allowed from `Idle` and `Success`.
    pub fn begin(&mut self) -> Result<(), CommerceError> {
        match self.phase {
            CheckoutPhase::Idle | CheckoutPhase::Success => {
                self.phase = CheckoutPhase::Submitting;
                self.last_error = None;
                self.attempts += 1;
                Ok(())
            }
            other => Err(self.invalid(other, CheckoutPhase::Submitting)),
        }
    }

    /// Finish the attempt successfully.
    pub fn succeed(&mut self, order_id: OrderId) -> Result<(), CommerceError> {
        if self.phase != CheckoutPhase::Submitting {
            return Err(self.invalid(self.phase, CheckoutPhase::Success));
        }
        self.phase = CheckoutPhase::Success;
        self.last_outcome = Some(CheckoutPhase::Success);
        self.last_order = Some(order_id);
        Ok(())
    }

    /// Finish the attempt with an error and return to `Idle`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CommerceError> {
        if self.phase != CheckoutPhase::Submitting {
            return Err(self.invalid(self.phase, CheckoutPhase::Failed));
        }
        self.last_outcome = Some(CheckoutPhase::Failed);
        self.last_error = Some(message.into());
        self.phase = CheckoutPhase::Idle;
        Ok(())
    }

    pub fn last_outcome(&self) -> Option<CheckoutPhase> {
        self.last_outcome
    }

    /// Message of the last failed attempt, cleared when a new one begins.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Order placed by the last successful attempt.
    pub fn last_order(&self) -> Option<&OrderId> {
        self.last_order.as_ref()
    }

    /// Number of attempts started.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn invalid(&self, from: CheckoutPhase, to: CheckoutPhase) -> CommerceError {
        CommerceError::InvalidCheckoutTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        }
    }
}
