#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for mr-tracker
//!
//! This library consolidates all functionality for the mr-tracker tool, which aggregates
//! merged requests and release tags across a GitLab group hierarchy into a single report.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`engine`]: Group discovery, activity retrieval, caching and report assembly
//! - [`reports`]: Report serialization in multiple formats

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

pub mod engine;

#[cfg(any(debug_assertions, test))]
pub mod reports;
#[cfg(not(any(debug_assertions, test)))]
mod reports;

pub use crate::commands::{Host, run};
