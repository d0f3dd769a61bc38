//! VM-creation wizard.
//!
//! ```text
//! user input → SelectionState → NavigationState::next → … → Summary
//!                                                     → WizardSession::generate_config
//!                                                     → WizardSession::materialize
//! ```

mod navigation;
mod session;
mod step;

pub use navigation::{NavigationState, plan_next};
pub use session::WizardSession;
pub use step::WizardStep;
