//! Build pipeline orchestration.
//!
//! The pipeline runs the stages in a fixed order and stops at the first
//! failure. The atlas is written on a background thread while the shader and
//! configuration header are generated; it is always joined before the
//! toolchain runs.

use crate::atlas::{plan_slots, AtlasError, AtlasJob};
use crate::build::assets::{copy_static_assets, prepare_out_dir, AssetError};
use crate::build::config_header::render_config_header;
use crate::build::discovery::{discover_elements, DiscoveryError};
use crate::build::header::render_header;
use crate::build::manifest::{ElementManifest, ManifestError};
use crate::build::progress::{NullProgress, ProgressEvent, ProgressReporter, StageStatus};
use crate::build::result::{BuildResult, Stage};
use crate::build::shader::preprocess_shader;
use crate::build::toolchain::{CommandRunner, SystemRunner, Toolchain, ToolchainError};
use crate::build::BuildContext;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Error during build execution.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Element discovery failed
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
    /// An element module could not be read or parsed
    #[error("Element error: {0}")]
    Manifest(#[from] ManifestError),
    /// Output preparation or static copy failed
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
    /// Atlas composition failed
    #[error("Atlas error: {0}")]
    Atlas(#[from] AtlasError),
    /// Compiler or type-checker failed
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),
    /// An input file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A generated file could not be written
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write a generated file in one piece, creating its parent directory.
fn write_generated(path: &Path, contents: &str) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| BuildError::Write { path: parent.to_path_buf(), source })?;
    }
    fs::write(path, contents).map_err(|source| BuildError::Write { path: path.to_path_buf(), source })
}

/// Build pipeline for executing builds.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
    /// Whether to wipe the output directory first
    clean: bool,
    /// Runs the compiler and type-checker
    runner: Box<dyn CommandRunner>,
    /// Receives stage progress
    reporter: Box<dyn ProgressReporter>,
}

impl BuildPipeline {
    /// Create a new build pipeline running real tools and reporting nothing.
    pub fn new(context: BuildContext) -> Self {
        Self {
            context,
            clean: false,
            runner: Box::new(SystemRunner),
            reporter: Box::new(NullProgress),
        }
    }

    /// Set clean mode (delete the output directory before building).
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Use a different command runner.
    pub fn with_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Use a different progress reporter.
    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Run the build pipeline.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        self.reporter.report(ProgressEvent::BuildStarted { clean: self.clean });

        let mut result = BuildResult::new();
        let outcome = self.execute(&mut result);
        result.total_duration = start.elapsed();

        match outcome {
            Ok(()) => {
                let timings = result
                    .timings()
                    .into_iter()
                    .map(|(name, d)| (name.to_string(), d.as_secs_f64() * 1000.0))
                    .collect();
                self.reporter.report(ProgressEvent::BuildCompleted { success: true, timings });
                Ok(result)
            }
            Err(e) => {
                self.reporter.report(ProgressEvent::BuildCompleted { success: false, timings: Vec::new() });
                Err(e)
            }
        }
    }

    fn execute(&self, result: &mut BuildResult) -> Result<(), BuildError> {
        let ctx = &self.context;

        let out_dir = ctx.out_dir();
        self.run_stage(result, Stage::Prepare, || {
            prepare_out_dir(&out_dir, ctx.project_root(), self.clean)?;
            Ok(((), vec![]))
        })?;

        let manifest = self.run_stage(result, Stage::Discover, || {
            let sources = discover_elements(&ctx.elements_dir(), ctx.config().discovery.order)?;
            Ok((ElementManifest::load(&sources)?, vec![]))
        })?;
        result.element_count = manifest.len();
        if manifest.is_empty() {
            self.warn(format!("no elements found under {}", ctx.elements_dir().display()));
        }

        self.run_stage(result, Stage::Header, || {
            let path = ctx.header_path();
            write_generated(&path, &render_header(&manifest, &ctx.config().header.includes))?;
            Ok(((), vec![path]))
        })?;

        self.run_stage(result, Stage::StaticAssets, || {
            let copied = copy_static_assets(&ctx.static_dir(), &out_dir)?;
            log::debug!("copied {} static files", copied);
            Ok(((), vec![]))
        })?;

        let fallback = ctx.fallback_texture();
        let slots = plan_slots(&manifest, &ctx.textures_dir(), &fallback);
        for slot in slots.iter().filter(|s| s.ordinal.is_some() && s.is_fallback(&fallback)) {
            if let Some(element) = manifest.iter().find(|e| Some(e.ordinal) == slot.ordinal) {
                self.warn(format!("element '{}' has no texture, using fallback", element.name));
            }
        }

        self.reporter.report(ProgressEvent::StageStarted { stage: Stage::Atlas });
        let atlas_start = Instant::now();
        let atlas_job = AtlasJob::spawn(slots, ctx.atlas_path());

        let generated = self.generate_sources(result, &manifest);

        // Joined even when generation failed so no writer outlives the build.
        let atlas = atlas_job
            .wait()
            .map(|summary| ((), vec![summary.path]))
            .map_err(BuildError::from);
        let atlas = self.finish_stage(result, Stage::Atlas, atlas_start, atlas);
        generated?;
        atlas?;

        let toolchain = Toolchain::new(ctx, self.runner.as_ref());
        self.run_stage(result, Stage::Compile, || {
            let wasm = toolchain.compile()?;
            Ok(((), vec![wasm]))
        })?;
        self.run_stage(result, Stage::TypeCheck, || {
            toolchain.type_check()?;
            Ok(((), vec![]))
        })?;

        Ok(())
    }

    /// Write the finalized shader and the configuration header.
    fn generate_sources(&self, result: &mut BuildResult, manifest: &ElementManifest) -> Result<(), BuildError> {
        let ctx = &self.context;

        self.run_stage(result, Stage::Shader, || {
            let template_path = ctx.shader_template();
            let template = fs::read_to_string(&template_path)
                .map_err(|source| BuildError::Read { path: template_path.clone(), source })?;
            let path = ctx.shader_path();
            write_generated(&path, &preprocess_shader(manifest, &template))?;
            Ok(((), vec![path]))
        })?;

        self.run_stage(result, Stage::ConfigHeader, || {
            let path = ctx.config_header_path();
            write_generated(&path, &render_config_header(ctx.config()))?;
            Ok(((), vec![path]))
        })
    }

    fn run_stage<T>(
        &self,
        result: &mut BuildResult,
        stage: Stage,
        f: impl FnOnce() -> Result<(T, Vec<PathBuf>), BuildError>,
    ) -> Result<T, BuildError> {
        self.reporter.report(ProgressEvent::StageStarted { stage });
        let start = Instant::now();
        let outcome = f();
        self.finish_stage(result, stage, start, outcome)
    }

    fn finish_stage<T>(
        &self,
        result: &mut BuildResult,
        stage: Stage,
        start: Instant,
        outcome: Result<(T, Vec<PathBuf>), BuildError>,
    ) -> Result<T, BuildError> {
        let duration = start.elapsed();
        match outcome {
            Ok((value, outputs)) => {
                self.reporter.report(ProgressEvent::StageCompleted {
                    stage,
                    status: StageStatus::Success,
                });
                result.add_stage(stage, outputs, duration);
                Ok(value)
            }
            Err(e) => {
                self.reporter.report(ProgressEvent::StageCompleted {
                    stage,
                    status: StageStatus::Failed(e.to_string()),
                });
                Err(e)
            }
        }
    }

    fn warn(&self, message: String) {
        log::warn!("{}", message);
        self.reporter.report(ProgressEvent::Warning { message });
    }
}
