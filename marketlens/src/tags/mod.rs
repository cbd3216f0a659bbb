//! Tag overlay store.
//!
//! User classification tags (partner, competitor, custom) keyed by
//! (scope, entity id). Writes are applied optimistically: a pending write
//! overrides repository reads until it settles, and is rolled back if the
//! repository rejects it. Every effective change is broadcast so open views
//! can patch themselves.

mod error;
mod overlay;

pub use error::TagError;
pub use overlay::{TagChange, TagOverlayStore, CHANGE_CHANNEL_CAPACITY};
