//! Tournament session state for Tourney.
//!
//! This crate owns the one piece of shared mutable state in the bot:
//!
//! 1. **Lifecycle** ([`SessionPhase`]): unprepared, prepared, lobbies active.
//! 2. **Roster and tags** ([`SessionState`]): participants, managers,
//!    banned members and lobby tags, applied through the platform.
//! 3. **Locking** ([`SessionLock`]): many readers or one writer, with
//!    no fairness between the two.
//!
//! # How it fits in the stack
//!
//! ```text
//! Bot (above)        ← takes the lock, runs one command against the state
//!     ↕
//! Session (this crate)
//!     ↕
//! Platform / Lobby (below)  ← side effects, partitioning
//! ```

mod error;
mod layout;
mod lock;
pub mod permissions;
mod phase;
mod state;

pub use error::SessionError;
pub use layout::{LayoutConfig, SessionResources};
pub use lock::{ReadGuard, SessionLock, WriteGuard};
pub use phase::SessionPhase;
pub use state::{Lobby, LobbyAssignment, ResourceWatch, SessionState};
