//! Three-legged OAuth handshake against a local redirect listener.

pub mod consent;
pub mod error;
pub mod exchange;
pub mod handshake;
pub mod token;

pub use error::AuthError;
pub use exchange::{HttpTokenExchanger, TokenExchanger};
pub use handshake::{begin_handshake, Handshake, HandshakeConfig, SessionMonitor, SessionState};
pub use token::TokenResult;
