//! SiteRM Console - operator console for a SiteRM frontend
//!
//! Bearer-token session handling, periodic health polling, and data-driven
//! views of site and host configuration, usable from the terminal or served
//! as a local web console.

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod explorer;
pub mod render;
pub mod status;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

pub use core::config::Config;
pub use core::error::{Error, Result};
