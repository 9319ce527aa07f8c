//! Typed CDP domain definitions.
//!
//! Hand-written parameter/result/event structs for the protocol domains
//! the runtime speaks. Field names follow the wire (`camelCase` via
//! serde); optional fields are omitted from the frame when unset.

pub mod browser;
pub mod dom;
pub mod emulation;
pub mod fetch;
pub mod input;
pub mod network;
pub mod page;
pub mod runtime;
pub mod storage;
pub mod target_domain;

pub use network::{Cookie, CookieParam, CookieSameSite};
pub use target_domain::TargetInfo;
