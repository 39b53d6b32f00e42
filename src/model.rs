//! Domain model shared by the engine: identifiers, credentials, records, and derived views.

pub mod credential;
pub mod id;
pub mod secret;
pub mod signal;
pub mod snapshot;
pub mod summary;
pub mod user;

pub use credential::*;
pub use id::*;
pub use secret::*;
pub use signal::*;
pub use snapshot::*;
pub use summary::*;
pub use user::*;
