//! CLI module for the FloatChat command-line interface.
//!
//! Thin wrappers that build a [`floatchat::QueryEngine`] from configuration
//! and print its answers as text or JSON.

mod commands;
mod output;

pub use commands::*;
