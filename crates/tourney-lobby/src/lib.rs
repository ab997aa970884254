//! Lobby partitioning and presence eligibility.
//!
//! Pure logic used by the bulk commands:
//!
//! - [`partition`] splits members into lobbies of bounded capacity.
//! - [`classify`] decides whether a member may be moved to a room.
//! - [`MoveLedger`] records per-member outcomes for the report.
//!
//! Nothing here performs I/O.

mod config;
mod eligibility;
mod ledger;
mod partition;

pub use config::{DEFAULT_CAPACITY, DEFAULT_PROTECTED_CATEGORIES, LobbyConfig, PresenceConfig};
pub use eligibility::{Eligibility, Venue, classify};
pub use ledger::{Bucket, MoveLedger};
pub use partition::{Partition, partition, partition_with};
