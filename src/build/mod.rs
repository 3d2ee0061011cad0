//! Build pipeline module for simforge
//!
//! Turns the element modules, textures and static files of a project into a
//! runnable build folder.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Find element modules and extract their data layouts
//! - **Generation**: Write the element header, shader and config header
//! - **Assets**: Copy static files and compose the texture atlas
//! - **Toolchain**: Compile the WebAssembly module and type-check the host code
//!
//! # Example
//!
//! ```ignore
//! use simforge::build::{BuildContext, BuildPipeline};
//! use simforge::config::load_config;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root);
//! let pipeline = BuildPipeline::new(context).with_clean(true);
//!
//! let result = pipeline.build()?;
//! println!("{}", result.summary());
//! ```

pub mod assets;
pub mod config_header;
pub mod context;
pub mod discovery;
pub mod extract;
pub mod header;
pub mod manifest;
pub mod pipeline;
pub mod progress;
pub mod result;
pub mod shader;
pub mod toolchain;

pub use context::*;
pub use discovery::{discover_elements, DiscoveryError, ElementSource};
pub use extract::{extract_data_layout, ExtractionError};
pub use manifest::{ElementDefinition, ElementManifest, ManifestError};
pub use pipeline::{BuildError, BuildPipeline};
pub use progress::{ConsoleProgress, NullProgress, ProgressEvent, ProgressReporter};
pub use result::{BuildResult, Stage};
pub use toolchain::{CommandRunner, SystemRunner, ToolExit, ToolInvocation, ToolchainError};
