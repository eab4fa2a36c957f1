//! Forager
//!
//! Polls a directory for new files and hands each one to a callback once it
//! has stopped changing. Built for ingestion pipelines that must not read a
//! file while it is still being written.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod observability;
pub mod scan;
pub mod sniff;

pub use config::Config;
pub use error::{Error, Result};
pub use scan::{FileCache, Forager, Scanner};
