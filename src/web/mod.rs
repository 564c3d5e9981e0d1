//! SiteRM Web Console
//!
//! Serves the console page on localhost. The page itself is rendered from the
//! shared document; the browser only swaps in lazily loaded panes.

pub mod page;
pub mod server;

pub use server::{router, run, spawn_session_watcher, ConsoleState};
