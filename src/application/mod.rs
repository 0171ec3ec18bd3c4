// Application layer - use cases and orchestration.
// The HTTP server and the tests talk to `TripService`; nothing outside this
// module touches the repository directly.

pub mod auth;
pub mod error;
pub mod service;

pub use auth::{Claims, TokenError, TokenSigner};
pub use error::*;
pub use service::*;
