//! Deciding which discovered items are worth paying for.

mod defaults;
mod engine;
mod item;
mod trigger;

pub use defaults::default_triggers;
pub use engine::{BatchEvaluation, ItemClass, TriggerEngine, TriggerMatch};
pub use item::{DiscoveredItem, ItemMetadata};
pub use trigger::{MAX_PRIORITY, MIN_PRIORITY, Trigger};
