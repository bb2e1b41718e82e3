//! Core types for shallow child-key reads against a hierarchical REST store.
//!
//! This crate provides:
//! - `NodeReference` - Handle to a node location
//! - `FetchOptions` - Retry, timeout and credential settings for one call
//! - `Target` - Resolved shallow REST request
//! - `CredentialProvider` / `HttpTransport` - Seams for external collaborators
//! - `KeyList` - Child keys in their wire encoding
//! - `KeyFetchError` - Error taxonomy

mod credentials;
mod error;
mod keys;
mod options;
mod reference;
mod target;
mod transport;

pub use credentials::*;
pub use error::*;
pub use keys::*;
pub use options::*;
pub use reference::*;
pub use target::*;
pub use transport::*;
