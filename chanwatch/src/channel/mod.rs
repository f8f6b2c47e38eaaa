//! Tracked channels and their mutable state.

mod registry;
mod state;

pub use registry::ChannelRegistry;
pub use state::{ChannelState, LiveTransition};
