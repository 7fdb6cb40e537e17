//! Identity boundary
//!
//! Tokens are issued by the external auth layer; this module only
//! verifies them:
//! - Signed session tokens
//! - Authentication middleware and extractor

mod middleware;
pub mod session;

pub use middleware::{CurrentUser, TOKEN_COOKIE, require_auth};
pub use session::{Session, create_session_token, verify_session_token};
