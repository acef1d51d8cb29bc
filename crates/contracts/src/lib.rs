//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend only on this crate, never on each other in reverse.
//!
//! ## Ordering Model
//! - Records keep arrival order per [`TenantKey`]
//! - Records of different tenants are never merged into one [`Batch`]

mod config;
mod delivery;
mod error;
mod record;
mod tenant;

pub use config::*;
pub use delivery::*;
pub use error::*;
pub use record::*;
pub use tenant::{SharedId, TenantKey};
