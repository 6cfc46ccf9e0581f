//! slipway-lib: build and packaging orchestration for target matrices
//!
//! This crate drives an external publish toolchain across a matrix of
//! (platform, architecture) targets:
//! - `platform`: supported targets and their runtime identifiers
//! - `config`: project layout and per-run build settings
//! - `runner`: tool process spawning and lossless output pumping
//! - `progress`: progress/error classification of raw tool output
//! - `orchestrator`: the per-target pipeline and matrix driver
//! - `package`: per-platform artifact archiving
//! - `logs`: persistent per-attempt build logs

pub mod config;
pub mod logs;
pub mod orchestrator;
pub mod package;
pub mod platform;
pub mod progress;
pub mod report;
pub mod runner;
pub mod util;
