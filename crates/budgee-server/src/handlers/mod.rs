//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod advisor;
pub mod audit;
pub mod auth;
pub mod budget;
pub mod conversations;
pub mod events;
pub mod export;
pub mod mood;
pub mod notifications;
pub mod transactions;

// Re-export all handlers for use in router
pub use advisor::*;
pub use audit::*;
pub use auth::*;
pub use budget::*;
pub use conversations::*;
pub use events::*;
pub use export::*;
pub use mood::*;
pub use notifications::*;
pub use transactions::*;
