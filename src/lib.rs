//! Fake news detector library

pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod inference;
pub mod models;
pub mod news;
pub mod output;

pub use config::Config;
pub use error::{DetectorError, Result};
