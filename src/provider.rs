//! Provider-facing configuration (descriptors), behavior (hooks), and constructed clients.
//!
//! `descriptor` holds the validated per-client configuration, `hooks` lets providers classify
//! token endpoint errors and extend token requests, `client` turns a descriptor into a
//! [`Provider`] for one grant, and `cache` keeps constructed providers in a bounded LRU.

pub mod cache;
pub mod client;
pub mod descriptor;
pub mod hooks;

pub use cache::*;
pub use client::*;
pub use descriptor::*;
pub use hooks::*;
