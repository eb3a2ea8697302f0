//! Live change propagation from source roots into the mirror.
//!
//! ```text
//! notify stream (one per root)
//!       |
//!   classify          pure event -> action mapping
//!       |
//! WatchDispatcher     sequential per-root apply loop
//!       |
//!  TreeMirror / SignalNotifier
//! ```

mod classify;
mod dispatcher;
mod error;

pub use classify::{ClassifiedEvent, classify};
pub use dispatcher::WatchDispatcher;
pub use error::WatchError;
