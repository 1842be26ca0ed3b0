pub mod transformer;
pub mod types;

pub use transformer::{Effect, Reconciler};
pub use types::{GameAction, ServerEvent};
