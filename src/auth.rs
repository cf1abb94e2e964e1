//! OAuth credentials, authorization URLs, token exchanges, and the token manager.

pub mod authorize;
pub mod credential;
pub mod exchange;
pub mod manager;
pub mod scope;
pub mod secret;

pub use authorize::*;
pub use credential::*;
pub use exchange::*;
pub use manager::*;
pub use scope::*;
pub use secret::*;
