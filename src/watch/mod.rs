// src/watch/mod.rs

//! Commit-based change detection.
//!
//! A pipeline needs a run when it has never run, when its working copy is
//! gone, or when the head of its branch differs from the commit recorded by
//! its most recent run.

pub mod detector;

pub use detector::{ChangeDetector, ChangeStatus};
