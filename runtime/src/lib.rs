// Copyright 2026 Filingscope Contributors
// SPDX-License-Identifier: Apache-2.0

//! filingscope runtime library: tiered acquisition of NSE corporate filings,
//! quotes and financial results.
//!
//! Every category fetch tries the JSON API first, then the primed static
//! page, then a real browser. The library crate exposes the core modules for
//! the binary and for integration testing.

#![allow(clippy::new_without_default)]

pub mod acquisition;
pub mod category;
pub mod cli;
pub mod config;
pub mod error;
pub mod extraction;
pub mod harvest;
pub mod live;
pub mod pool;
pub mod renderer;
pub mod rest;
pub mod stealth;

pub use category::Category;
pub use config::RuntimeConfig;
pub use error::{ErrorKind, FetchError, FetchFailure};
pub use harvest::{Harvest, Harvester};
