//! Configuration schema types for `simforge.toml` (and legacy `config.json`)
//!
//! Defines the structure and validation rules for the simulation build configuration.

use super::loader::normalize_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// WebAssembly linear memory page size in bytes.
pub const WASM_PAGE_SIZE: u64 = 64 * 1024;

/// Order in which discovered element modules receive their ordinals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryOrder {
    /// Raw directory listing order, exactly as the filesystem enumerates it
    #[default]
    Listing,
    /// Sorted by element name
    Name,
}

/// Filesystem layout of the project.
///
/// All paths are relative to the project root unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the element subtree and the generated header
    #[serde(default = "default_elements")]
    pub elements: PathBuf,
    /// Generated element header
    #[serde(default = "default_header")]
    pub header: PathBuf,
    /// Generated configuration header
    #[serde(default = "default_config_header")]
    pub config_header: PathBuf,
    /// Root of the native source tree handed to the compiler
    #[serde(default = "default_native_src")]
    pub native_src: PathBuf,
    /// Directory of per-element textures (`<name>.png`)
    #[serde(default = "default_textures")]
    pub textures: PathBuf,
    /// Texture used for elements without their own, and for padding slots
    #[serde(default = "default_fallback_texture")]
    pub fallback_texture: PathBuf,
    /// Static asset tree copied into the output directory
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Shader template the element constants are prepended to
    #[serde(default = "default_shader_template")]
    pub shader_template: PathBuf,
    /// Build output directory
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            elements: default_elements(),
            header: default_header(),
            config_header: default_config_header(),
            native_src: default_native_src(),
            textures: default_textures(),
            fallback_texture: default_fallback_texture(),
            static_dir: default_static_dir(),
            shader_template: default_shader_template(),
            out: default_out(),
        }
    }
}

fn default_elements() -> PathBuf {
    PathBuf::from("src/c/elements")
}

fn default_header() -> PathBuf {
    PathBuf::from("src/c/elements/elementdata.h")
}

fn default_config_header() -> PathBuf {
    PathBuf::from("src/c/config.h")
}

fn default_native_src() -> PathBuf {
    PathBuf::from("src/c")
}

fn default_textures() -> PathBuf {
    PathBuf::from("src/textures")
}

fn default_fallback_texture() -> PathBuf {
    PathBuf::from("src/textures/missing.png")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("src/static")
}

fn default_shader_template() -> PathBuf {
    PathBuf::from("src/static/shaders/elements.glsl")
}

fn default_out() -> PathBuf {
    PathBuf::from("build")
}

impl PathsConfig {
    /// Project inputs, keyed by field name.
    pub fn inputs(&self) -> [(&'static str, &Path); 6] {
        [
            ("elements", self.elements.as_path()),
            ("native_src", self.native_src.as_path()),
            ("textures", self.textures.as_path()),
            ("fallback_texture", self.fallback_texture.as_path()),
            ("static_dir", self.static_dir.as_path()),
            ("shader_template", self.shader_template.as_path()),
        ]
    }
}

/// Element discovery settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// How discovered elements are ordered
    #[serde(default)]
    pub order: DiscoveryOrder,
}

/// Generated header settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderConfig {
    /// Files `#include`d by the generated header
    #[serde(default = "default_includes")]
    pub includes: Vec<String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self { includes: default_includes() }
    }
}

fn default_includes() -> Vec<String> {
    vec!["../main.h".to_string()]
}

/// External tool settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Native compiler/linker executable
    #[serde(default = "default_compiler")]
    pub compiler: String,
    /// Type-checker command line (program followed by arguments)
    #[serde(default = "default_type_checker")]
    pub type_checker: Vec<String>,
    /// Stack reservation in bytes
    #[serde(default = "default_stack_size")]
    pub stack_size: u64,
    /// ThinLTO cache directory
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Extra flags appended before the output argument
    #[serde(default)]
    pub extra_flags: Vec<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            type_checker: default_type_checker(),
            stack_size: default_stack_size(),
            cache_dir: default_cache_dir(),
            extra_flags: Vec::new(),
        }
    }
}

fn default_compiler() -> String {
    "clang".to_string()
}

fn default_type_checker() -> Vec<String> {
    vec!["npx".to_string(), "tsc".to_string()]
}

fn default_stack_size() -> u64 {
    65536
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_memory() -> u64 {
    64 * 1024 * 1024
}

/// Complete build configuration.
///
/// Resolved once per build and then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Debug build: DWARF info, no optimisation, `DEBUG 1`
    #[serde(default)]
    pub debug: bool,
    /// Enable the GPU simulation path (`USE_GPU 1`)
    #[serde(default)]
    pub gpu: bool,
    /// Shared linear memory size in bytes (initial = max)
    #[serde(default = "default_memory")]
    pub memory: u64,
    /// Project layout
    #[serde(default)]
    pub paths: PathsConfig,
    /// Element discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Generated header settings
    #[serde(default)]
    pub header: HeaderConfig,
    /// External tools
    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            debug: false,
            gpu: false,
            memory: default_memory(),
            paths: PathsConfig::default(),
            discovery: DiscoveryConfig::default(),
            header: HeaderConfig::default(),
            toolchain: ToolchainConfig::default(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "toolchain.stack_size")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' {}", self.field, self.message)
    }
}

impl BuildConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.memory == 0 || self.memory % WASM_PAGE_SIZE != 0 {
            errors.push(ConfigValidationError {
                field: "memory".to_string(),
                message: format!("must be a positive multiple of {} bytes", WASM_PAGE_SIZE),
            });
        }

        if self.toolchain.compiler.trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "toolchain.compiler".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        if self.toolchain.type_checker.is_empty() {
            errors.push(ConfigValidationError {
                field: "toolchain.type_checker".to_string(),
                message: "must name a program".to_string(),
            });
        }

        if self.toolchain.stack_size == 0 || self.toolchain.stack_size % 16 != 0 {
            errors.push(ConfigValidationError {
                field: "toolchain.stack_size".to_string(),
                message: "must be a positive multiple of 16".to_string(),
            });
        }

        if self.toolchain.stack_size >= self.memory {
            errors.push(ConfigValidationError {
                field: "toolchain.stack_size".to_string(),
                message: "must be smaller than memory".to_string(),
            });
        }

        self.validate_out_dir(&mut errors);

        errors
    }

    /// `paths.out` is wiped by clean builds, so it must not be the project
    /// root, climb above it, or hold any project input.
    fn validate_out_dir(&self, errors: &mut Vec<ConfigValidationError>) {
        let out = normalize_path(&self.paths.out);
        if out.parent().is_none() || out.starts_with("..") {
            errors.push(ConfigValidationError {
                field: "paths.out".to_string(),
                message: "must be a directory inside the project root".to_string(),
            });
            return;
        }

        for (field, input) in self.paths.inputs() {
            let input = normalize_path(input);
            if input.is_absolute() == out.is_absolute() && input.starts_with(&out) {
                errors.push(ConfigValidationError {
                    field: "paths.out".to_string(),
                    message: format!("must not contain paths.{}", field),
                });
            }
        }
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
