//! Interception-capture-conversion-storage pipeline for game CDN assets.
//!
//! Two-stage traffic interception discovers asset identities before
//! content arrives and correlates content when it does; a background
//! worker pool resolves derived formats without blocking the traffic
//! path; captured assets land in a content-addressable store with a
//! crash-consistent index; and a version-polymorphic decoder turns
//! proprietary mesh payloads into a portable representation.

pub mod asset;
pub mod config;
pub mod convert;
pub mod error;
pub mod mesh;
pub mod pipeline;
pub mod store;
pub mod traffic;

pub use asset::AssetKey;
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use pipeline::coordinator::Pipeline;
