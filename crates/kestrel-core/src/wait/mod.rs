//! Load-state tracking and lifecycle waits.

pub mod load_state;

pub use load_state::{LifecycleWaiter, LoadState};
