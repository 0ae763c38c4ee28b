pub mod actions;
pub mod cache;
pub mod chain;
pub mod config;
pub mod error;
pub mod extraction;
pub mod interfaces;
pub mod keys;
pub mod logging;
pub mod plugins;
pub mod price;
pub mod runtime;
pub mod units;
pub mod wallet;

pub use crate::error::{ErrorKind, LedgerPilotError, Result};
