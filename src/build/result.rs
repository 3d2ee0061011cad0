//! Build result types.
//!
//! Contains the stages of a build and the timings recorded for them.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// One stage of the build, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Create (or clean) the output directory
    Prepare,
    /// Discover elements and extract their data layouts
    Discover,
    /// Write the element header
    Header,
    /// Copy the static asset tree
    StaticAssets,
    /// Compose and write the atlas
    Atlas,
    /// Write the finalized shader
    Shader,
    /// Write the configuration header
    ConfigHeader,
    /// Compile the WebAssembly module
    Compile,
    /// Type-check the host sources
    TypeCheck,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 9] = [
        Stage::Prepare,
        Stage::Discover,
        Stage::Header,
        Stage::StaticAssets,
        Stage::Atlas,
        Stage::Shader,
        Stage::ConfigHeader,
        Stage::Compile,
        Stage::TypeCheck,
    ];

    /// Short identifier.
    pub fn id(&self) -> &'static str {
        match self {
            Stage::Prepare => "prepare",
            Stage::Discover => "discover",
            Stage::Header => "header",
            Stage::StaticAssets => "static",
            Stage::Atlas => "atlas",
            Stage::Shader => "shader",
            Stage::ConfigHeader => "config",
            Stage::Compile => "compile",
            Stage::TypeCheck => "typecheck",
        }
    }

    /// Human-readable progress message.
    pub fn description(&self) -> &'static str {
        match self {
            Stage::Prepare => "preparing build folder",
            Stage::Discover => "discovering elements",
            Stage::Header => "generating elementdata.h",
            Stage::StaticAssets => "copying static files",
            Stage::Atlas => "generating atlas.png",
            Stage::Shader => "generating elements.glsl",
            Stage::ConfigHeader => "setting config macros",
            Stage::Compile => "compiling wasm",
            Stage::TypeCheck => "running type-check",
        }
    }

    /// Whether the stage runs an external tool.
    pub fn is_external(&self) -> bool {
        matches!(self, Stage::Compile | Stage::TypeCheck)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Result of one completed stage.
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Stage that ran
    pub stage: Stage,
    /// Files written by the stage
    pub outputs: Vec<PathBuf>,
    /// Wall time of the stage
    pub duration: Duration,
}

/// Result of a complete, successful build run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Completed stages in the order they finished
    pub stages: Vec<StageResult>,
    /// Number of elements discovered
    pub element_count: usize,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed stage.
    pub fn add_stage(&mut self, stage: Stage, outputs: Vec<PathBuf>, duration: Duration) {
        self.stages.push(StageResult { stage, outputs, duration });
    }

    /// Look up a completed stage.
    pub fn stage(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// Whether a stage completed.
    pub fn has_stage(&self, stage: Stage) -> bool {
        self.stage(stage).is_some()
    }

    /// Timings reported at the end of a build: the external tools and the total.
    pub fn timings(&self) -> Vec<(&'static str, Duration)> {
        let mut timings: Vec<(&'static str, Duration)> = self
            .stages
            .iter()
            .filter(|s| s.stage.is_external())
            .map(|s| (s.stage.id(), s.duration))
            .collect();
        timings.push(("total", self.total_duration));
        timings
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Build succeeded: {} element{}, {} stages in {}",
            self.element_count,
            if self.element_count == 1 { "" } else { "s" },
            self.stages.len(),
            format_millis(self.total_duration)
        )];
        for stage in &self.stages {
            for output in &stage.outputs {
                lines.push(format!("  {} -> {}", stage.stage, output.display()));
            }
        }
        lines.push("--timings--".to_string());
        for (name, duration) in self.timings() {
            lines.push(format!("{}: {}", name, format_millis(duration)));
        }
        lines.push("--timings--".to_string());
        lines.join("\n")
    }
}

/// Format a duration as fractional milliseconds.
pub fn format_millis(duration: Duration) -> String {
    format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Compile.to_string(), "compile");
        assert_eq!(Stage::Header.description(), "generating elementdata.h");
    }

    #[test]
    fn test_stage_order_unique() {
        let ids: std::collections::HashSet<_> = Stage::ALL.iter().map(|s| s.id()).collect();
        assert_eq!(ids.len(), Stage::ALL.len());
    }

    #[test]
    fn test_only_tools_are_external() {
        let external: Vec<_> = Stage::ALL.iter().filter(|s| s.is_external()).collect();
        assert_eq!(external, vec![&Stage::Compile, &Stage::TypeCheck]);
    }

    #[test]
    fn test_build_result_stage_lookup() {
        let mut result = BuildResult::new();
        result.add_stage(Stage::Header, vec![PathBuf::from("elementdata.h")], Duration::from_millis(2));
        result.add_stage(Stage::Compile, vec![PathBuf::from("game.wasm")], Duration::from_millis(900));

        assert!(result.has_stage(Stage::Header));
        assert!(!result.has_stage(Stage::TypeCheck));
        assert_eq!(result.stage(Stage::Compile).map(|s| s.duration), Some(Duration::from_millis(900)));
    }

    #[test]
    fn test_timings_include_tools_and_total() {
        let mut result = BuildResult::new();
        result.add_stage(Stage::Header, vec![], Duration::from_millis(1));
        result.add_stage(Stage::Compile, vec![], Duration::from_millis(100));
        result.add_stage(Stage::TypeCheck, vec![], Duration::from_millis(50));
        result.total_duration = Duration::from_millis(200);

        let names: Vec<_> = result.timings().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["compile", "typecheck", "total"]);
    }

    #[test]
    fn test_build_result_summary() {
        let mut result = BuildResult::new();
        result.element_count = 3;
        result.add_stage(Stage::Header, vec![PathBuf::from("src/c/elementdata.h")], Duration::from_millis(2));
        result.add_stage(Stage::Compile, vec![PathBuf::from("build/game.wasm")], Duration::from_millis(1500));
        result.total_duration = Duration::from_millis(2000);
        let summary = result.summary();

        assert!(summary.contains("Build succeeded: 3 elements, 2 stages"));
        assert!(summary.contains("  header -> src/c/elementdata.h\n  compile -> build/game.wasm\n"));
        assert!(summary.contains("compile: 1500.000ms"));
        assert!(summary.contains("total: 2000.000ms"));
    }
}
