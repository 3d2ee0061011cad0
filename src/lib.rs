//! simforge - build system for a browser-hosted falling-sand simulation
//!
//! This library provides functionality to:
//! - Discover element modules and assign their ordinals
//! - Generate the element header, configuration header and shader
//! - Compose the element texture atlas
//! - Drive the wasm32 compiler and the type-checker

pub mod atlas;
pub mod build;
pub mod cli;
pub mod config;
