//! # CourseForge Common Library
//!
//! Shared code for CourseForge services including:
//! - Content document models (Book, Course)
//! - Common error types
//! - Configuration loading

pub mod config;
pub mod error;
pub mod models;

pub use error::{Error, Result};
