//! Utility modules for the bundler.

pub mod exec;
pub mod minify;
pub mod xml;
