//! Orchestration Layer
//!
//! This crate drives the metaball renderer frame by frame:
//! - Viewer configuration loading and validation
//! - Frame timing and the rolling FPS window
//! - The per-frame state machine (poll input, step, render, present, timing)
//!
//! Windowing, input delivery and presentation stay outside; the runner only
//! talks to them through the [`runner::InputSource`], [`runner::Presenter`]
//! and [`runner::Caption`] traits.

#![warn(missing_docs)]

pub mod config;
pub mod runner;
pub mod timing;

pub use config::ViewerConfig;
pub use runner::{FrameOutcome, FrameRunner};
pub use timing::{Clock, SystemClock};
