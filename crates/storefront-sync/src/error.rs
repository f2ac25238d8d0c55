//! Errors returned by the cart controllers.

use crate::backend::BackendError;
use thiserror::Error;

/// Errors from [`SyncController`](crate::SyncController) and the list loaders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No user is signed in. Nothing was changed.
    #[error("not signed in")]
    NotAuthenticated,

    /// The backend rejected the session; it was invalidated and the cart
    /// cleared.
    #[error("session expired")]
    SessionExpired,

    /// A checkout is being submitted; the cart is locked.
    #[error("checkout in progress")]
    CheckoutInProgress,

    /// The request never got an answer. The change was rolled back.
    #[error("network error: {0}")]
    Network(String),

    /// The backend refused the change. The change was rolled back.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend answered with something unreadable.
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl SyncError {
    /// Message suitable for showing to the customer.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::NotAuthenticated => "Please sign in to use the cart.".to_string(),
            SyncError::SessionExpired => {
                "Your session has expired. Please sign in again.".to_string()
            }
            SyncError::CheckoutInProgress => {
                "Your order is being placed; the cart can't be changed right now.".to_string()
            }
            SyncError::Network(_) => {
                "Couldn't reach the store. Your change was undone; please try again.".to_string()
            }
            SyncError::Rejected { message, .. } => message.clone(),
            SyncError::Protocol(_) => {
                "The store sent an unexpected response. Please try again.".to_string()
            }
        }
    }
}

impl From<BackendError> for SyncError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unauthorized => SyncError::SessionExpired,
            BackendError::Transport(message) => SyncError::Network(message),
            BackendError::Rejected { status, message } => SyncError::Rejected { status, message },
            BackendError::Decode(message) => SyncError::Protocol(message),
        }
    }
}

/// Errors from [`CheckoutOrchestrator`](crate::CheckoutOrchestrator).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// No user is signed in.
    #[error("not signed in")]
    NotAuthenticated,

    /// The backend rejected the session; it was invalidated.
    #[error("session expired")]
    SessionExpired,

    /// Nothing to order. No request was made.
    #[error("cart is empty")]
    EmptyCart,

    /// A submit is already in flight.
    #[error("checkout already being submitted")]
    AlreadySubmitting,

    /// Shipping or payment details are incomplete. No request was made.
    #[error("missing {0}")]
    IncompleteDetails(String),

    /// The request never got an answer.
    #[error("network error: {0}")]
    Network(String),

    /// The backend refused the order.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend answered with something unreadable.
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl CheckoutError {
    /// Message suitable for showing to the customer.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::NotAuthenticated => "Please sign in to check out.".to_string(),
            CheckoutError::SessionExpired => {
                "Your session has expired. Please sign in again.".to_string()
            }
            CheckoutError::EmptyCart => "Your cart is empty.".to_string(),
            CheckoutError::AlreadySubmitting => "Your order is already being placed.".to_string(),
            CheckoutError::IncompleteDetails(missing) => {
                format!("Please fill in: {}.", missing)
            }
            CheckoutError::Network(_) => {
                "Couldn't reach the store. Your order was not placed; please try again."
                    .to_string()
            }
            CheckoutError::Rejected { message, .. } => message.clone(),
            CheckoutError::Protocol(_) => {
                "The store sent an unexpected response. Check your orders before retrying."
                    .to_string()
            }
        }
    }
}

impl From<BackendError> for CheckoutError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unauthorized => CheckoutError::SessionExpired,
            BackendError::Transport(message) => CheckoutError::Network(message),
            BackendError::Rejected { status, message } => {
                CheckoutError::Rejected { status, message }
            }
            BackendError::Decode(message) => CheckoutError::Protocol(message),
        }
    }
}
