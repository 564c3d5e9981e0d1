//! Configuration and error types shared by every console component

pub mod config;
pub mod error;
