//! Core shared types for flexdeps.
//!
//! Everything in here is a leaf: class reference values, the path filter used
//! by every directory walk, and a handful of filesystem helpers.

mod class_ref;
pub mod filter;
pub mod fs;

pub use class_ref::ClassReference;
pub use filter::{list_paths, FilterToken, ListOptions, PathFilter};
