pub mod cleanup;
pub mod cli;
pub mod logging;
pub mod mirror;
pub mod notifier;
pub mod paths;
pub mod render;
pub mod watcher;

pub use cleanup::{CleanupAction, CleanupRegistry};
pub use mirror::{ContentChannel, MirrorError, TreeMirror, release_channel};
pub use notifier::{SignalNotifier, parse_signal};
pub use render::{EnvRenderer, RenderError, TemplateRenderer};
pub use watcher::{ClassifiedEvent, WatchDispatcher, WatchError, classify};
