//! Session collaborator for the storefront client.
//!
//! Token issuance and decoding happen elsewhere; this crate only holds the
//! bearer token of the signed-in user and forgets it when the backend
//! rejects it.

mod error;
mod session;
mod token;

pub use error::AuthError;
pub use session::{AuthSession, SessionHandle};
pub use token::BearerToken;
