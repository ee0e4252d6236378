//! Cataloging orchestrator.
//!
//! Sequences the wizard, the store and the mirror publisher for each command
//! and reaction event. This is the only component that knows which channel
//! is which and who counts as staff.

mod cataloger;
mod types;

pub use cataloger::Cataloger;
pub use types::{CatalogingContext, CatalogingError, Command, CommandContext, ReactionOutcome};
