//! Network observation: capture, filter, wait, and stream.

pub mod filter;
pub mod observer;
pub mod types;

pub use filter::{FilterCriteria, NetworkFilter};
pub use observer::{NetworkObserver, NetworkStream, ObserverConfig, ObserverStats};
pub use types::{
    HttpMethod, NetworkEntry, NetworkRequest, NetworkResponse, ResourceKind, StreamingChunk,
};
