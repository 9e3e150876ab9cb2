//! Command-line driver for kaldo-asr.

pub mod cli;
pub mod config;
pub mod decode;
