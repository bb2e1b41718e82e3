//! Shallow child-key fetcher.
//!
//! Lists the immediate children of a node in a hierarchical REST store
//! without downloading their values:
//!
//! 1. resolve the node to `<node>.json?shallow=true` plus credentials,
//! 2. issue the GET, retrying transient failures up to `max_tries`,
//! 3. scan the body for top-level keys, keeping their wire encoding.
//!
//! # Example
//!
//! ```rust,ignore
//! use childkeys_core::{FetchOptions, NodeReference};
//! use childkeys_fetch::KeyFetcher;
//!
//! let fetcher = KeyFetcher::new()?;
//! let node = NodeReference::parse("https://my-db.example.com/rooms")?;
//! let options = FetchOptions::new()
//!     .with_max_tries(3)
//!     .with_access_token(token);
//!
//! let keys = fetcher.fetch_child_keys(&node, &options).await?;
//! ```

mod extract;
mod fetcher;
mod http;
mod retry;
mod timeout;

pub use extract::*;
pub use fetcher::*;
pub use http::*;
pub use retry::*;
pub use timeout::*;

pub use childkeys_core::{FetchOptions, KeyFetchError, KeyList, NodeReference};
