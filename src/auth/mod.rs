//! Authentication core: token codec and verification flow orchestration.

pub mod flow;
pub mod token;

pub use flow::{AuthConfig, AuthFlow, AuthFlowError};
pub use token::{SessionPayload, SignedToken, TokenError, TokenPair};
