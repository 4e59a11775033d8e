//! Session handling: token decoding, the persisted token slot and the
//! process-wide session store.

pub mod session;
pub mod storage;
pub mod token;

pub use session::{AuthEvent, AuthStore, Session, LOGIN_ROUTE};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore, ACCESS_TOKEN_IDENTIFIER};
pub use token::{decode_claims, TokenClaims, TokenError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("session storage error: {0}")]
    Storage(#[from] std::io::Error),
}
