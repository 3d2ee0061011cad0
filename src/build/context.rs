//! Build context containing configuration and paths for a build.

use crate::config::BuildConfig;
use std::path::{Path, PathBuf};

/// File name of the composite atlas inside the output directory.
pub const ATLAS_FILE: &str = "atlas.png";
/// Path of the finalized shader inside the output directory.
pub const SHADER_FILE: &str = "shaders/elements.glsl";
/// File name of the compiled module inside the output directory.
pub const WASM_FILE: &str = "game.wasm";

/// Build context containing configuration and paths for a build operation.
///
/// The context is created once per invocation and handed to every stage by
/// reference; nothing in it changes while the build runs.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The resolved configuration
    config: BuildConfig,
    /// Project root directory (where the config file is located)
    project_root: PathBuf,
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// # Arguments
    /// - `config` - The resolved configuration
    /// - `project_root` - The project root directory
    pub fn new(config: BuildConfig, project_root: PathBuf) -> Self {
        Self { config, project_root }
    }

    /// Get the configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolve a path relative to the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        crate::config::loader::resolve_path(&self.project_root, path)
    }

    /// Directory holding the element subtree.
    pub fn elements_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.elements)
    }

    /// Generated element header.
    pub fn header_path(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.header)
    }

    /// Generated configuration header.
    pub fn config_header_path(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.config_header)
    }

    /// Native source tree root.
    pub fn native_src_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.native_src)
    }

    /// Per-element texture directory.
    pub fn textures_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.textures)
    }

    /// Shared fallback texture.
    pub fn fallback_texture(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.fallback_texture)
    }

    /// Static asset tree.
    pub fn static_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.static_dir)
    }

    /// Shader template source.
    pub fn shader_template(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.shader_template)
    }

    /// Output directory.
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.out)
    }

    /// Composite atlas output.
    pub fn atlas_path(&self) -> PathBuf {
        self.out_dir().join(ATLAS_FILE)
    }

    /// Finalized shader output.
    pub fn shader_path(&self) -> PathBuf {
        self.out_dir().join(SHADER_FILE)
    }

    /// Compiled WebAssembly output.
    pub fn wasm_path(&self) -> PathBuf {
        self.out_dir().join(WASM_FILE)
    }

    /// ThinLTO cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.toolchain.cache_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    fn ctx() -> BuildContext {
        BuildContext::new(default_config(), PathBuf::from("/project"))
    }

    #[test]
    fn test_build_context_new() {
        let ctx = ctx();
        assert_eq!(ctx.project_root(), Path::new("/project"));
    }

    #[test]
    fn test_build_context_resolve_path_absolute() {
        assert_eq!(ctx().resolve_path(Path::new("/other/path")), PathBuf::from("/other/path"));
    }

    #[test]
    fn test_build_context_default_layout() {
        let ctx = ctx();
        assert_eq!(ctx.elements_dir(), PathBuf::from("/project/src/c/elements"));
        assert_eq!(ctx.header_path(), PathBuf::from("/project/src/c/elements/elementdata.h"));
        assert_eq!(ctx.config_header_path(), PathBuf::from("/project/src/c/config.h"));
        assert_eq!(ctx.native_src_dir(), PathBuf::from("/project/src/c"));
        assert_eq!(ctx.fallback_texture(), PathBuf::from("/project/src/textures/missing.png"));
        assert_eq!(ctx.shader_template(), PathBuf::from("/project/src/static/shaders/elements.glsl"));
    }

    #[test]
    fn test_build_context_outputs() {
        let ctx = ctx();
        assert_eq!(ctx.out_dir(), PathBuf::from("/project/build"));
        assert_eq!(ctx.atlas_path(), PathBuf::from("/project/build/atlas.png"));
        assert_eq!(ctx.shader_path(), PathBuf::from("/project/build/shaders/elements.glsl"));
        assert_eq!(ctx.wasm_path(), PathBuf::from("/project/build/game.wasm"));
        assert_eq!(ctx.cache_dir(), PathBuf::from("/project/cache"));
    }
}
