//! CLI module for Stocksync

pub mod config;
pub mod error;
pub mod sync;
