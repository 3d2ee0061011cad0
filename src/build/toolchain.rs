//! External toolchain invocation: the wasm32 compiler and the type-checker.
//!
//! Tools run synchronously with inherited stdio, so their diagnostics reach
//! the console untouched. Any non-zero exit is fatal.

use crate::build::context::BuildContext;
use crate::build::discovery::{discover_native_sources, DiscoveryError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Suffix of the staging file the compiler writes to.
const STAGING_SUFFIX: &str = "partial";

/// Error running an external tool.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// Source discovery failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// No native sources to compile
    #[error("No native sources found under {}", .0.display())]
    NoSources(PathBuf),
    /// Tool command line is empty
    #[error("{tool}: no command configured")]
    EmptyCommand { tool: String },
    /// Tool could not be started
    #[error("{tool}: failed to run '{program}': {source}")]
    Spawn {
        tool: String,
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// Tool exited unsuccessfully
    #[error("{tool} failed ({})", describe_exit(.code))]
    Failed { tool: String, code: Option<i32> },
    /// Output file handling failed
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => "terminated by signal".to_string(),
    }
}

/// How a tool run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolExit {
    /// Exit status zero
    Success,
    /// Non-zero exit code, or `None` when killed by a signal
    Failed(Option<i32>),
}

/// A fully specified external tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Short tool name used in messages ("compiler", "type-check")
    pub tool: String,
    /// Executable
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub cwd: PathBuf,
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Executes tool invocations.
pub trait CommandRunner: Send + Sync {
    /// Run the invocation to completion.
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolExit>;
}

/// Runs tools as child processes sharing this process's stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolExit> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;

        Ok(if status.success() { ToolExit::Success } else { ToolExit::Failed(status.code()) })
    }
}

/// Render a path relative to `root` when it lives underneath it.
fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).to_string_lossy().into_owned()
}

/// Compiler arguments for a wasm32 build.
///
/// Produces a module with imported shared memory of `config.memory` bytes,
/// no libc or builtins, ThinLTO, a fixed stack and dynamically exported
/// symbols.
pub fn compile_args(
    ctx: &BuildContext,
    sources: &[PathBuf],
    output: &Path,
) -> Vec<String> {
    let config = ctx.config();
    let root = ctx.project_root();
    let memory = config.memory;

    let mut args: Vec<String> = [
        "-Wall",
        "-Wextra",
        "-Wpedantic",
        "-Wno-unused-parameter",
        "-Wno-strict-prototypes",
        "--target=wasm32",
        "-nostdlib",
        "-fno-builtin",
        "-matomics",
        "-mbulk-memory",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if config.debug {
        args.push("-gdwarf".to_string());
    } else {
        args.extend(["-msimd128", "-mrelaxed-simd", "-O3"].map(String::from));
    }
    args.extend(["-ffast-math", "-flto=thin"].map(String::from));
    if !config.debug {
        args.push("-Wl,--lto-O3".to_string());
    }

    args.push(format!("-Wl,--thinlto-cache-dir={}", display_path(root, &ctx.cache_dir())));
    args.extend(
        [
            "-Wl,--error-limit=0",
            "-Wl,--no-entry",
            "-Wl,--export-dynamic",
            "-Wl,--import-memory",
            "-Wl,--shared-memory",
        ]
        .map(String::from),
    );
    args.push(format!("-Wl,--initial-memory={}", memory));
    args.push(format!("-Wl,--max-memory={}", memory));
    args.push(format!("-Wl,-z,stack-size={}", config.toolchain.stack_size));
    args.extend(config.toolchain.extra_flags.iter().cloned());

    args.push("-o".to_string());
    args.push(display_path(root, output));
    args.extend(sources.iter().map(|s| display_path(root, s)));
    args
}

/// Staging path the compiler writes to before the result is moved into place.
pub fn staging_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(STAGING_SUFFIX);
    output.with_file_name(name)
}

/// Drives the external compiler and type-checker for one build.
pub struct Toolchain<'a> {
    ctx: &'a BuildContext,
    runner: &'a dyn CommandRunner,
}

impl<'a> Toolchain<'a> {
    /// Create a toolchain bound to a context and runner.
    pub fn new(ctx: &'a BuildContext, runner: &'a dyn CommandRunner) -> Self {
        Self { ctx, runner }
    }

    /// Invocation of the compiler for the current source tree.
    pub fn compile_invocation(&self, output: &Path) -> Result<ToolInvocation, ToolchainError> {
        let src_dir = self.ctx.native_src_dir();
        let sources = discover_native_sources(&src_dir)?;
        if sources.is_empty() {
            return Err(ToolchainError::NoSources(src_dir));
        }
        let program = self.ctx.config().toolchain.compiler.clone();
        if program.trim().is_empty() {
            return Err(ToolchainError::EmptyCommand { tool: "compiler".to_string() });
        }

        Ok(ToolInvocation {
            tool: "compiler".to_string(),
            program,
            args: compile_args(self.ctx, &sources, output),
            cwd: self.ctx.project_root().to_path_buf(),
        })
    }

    /// Invocation of the type-checker.
    pub fn type_check_invocation(&self) -> Result<ToolInvocation, ToolchainError> {
        let command = &self.ctx.config().toolchain.type_checker;
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ToolchainError::EmptyCommand { tool: "type-check".to_string() })?;

        Ok(ToolInvocation {
            tool: "type-check".to_string(),
            program: program.clone(),
            args: args.to_vec(),
            cwd: self.ctx.project_root().to_path_buf(),
        })
    }

    fn execute(&self, invocation: &ToolInvocation) -> Result<(), ToolchainError> {
        log::debug!("running {}", invocation);
        let exit = self.runner.run(invocation).map_err(|source| ToolchainError::Spawn {
            tool: invocation.tool.clone(),
            program: invocation.program.clone(),
            source,
        })?;

        match exit {
            ToolExit::Success => Ok(()),
            ToolExit::Failed(code) => Err(ToolchainError::Failed { tool: invocation.tool.clone(), code }),
        }
    }

    /// Compile the native tree to the WebAssembly output.
    ///
    /// Any previous binary is removed first and the new one is only moved
    /// into place after a successful compile, so a failure never leaves a
    /// binary at the output path.
    pub fn compile(&self) -> Result<PathBuf, ToolchainError> {
        let output = self.ctx.wasm_path();
        let staging = staging_path(&output);

        for stale in [&output, &staging] {
            if stale.exists() {
                fs::remove_file(stale)
                    .map_err(|source| ToolchainError::Io { path: stale.clone(), source })?;
            }
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ToolchainError::Io { path: parent.to_path_buf(), source })?;
        }

        let invocation = self.compile_invocation(&staging)?;
        if let Err(e) = self.execute(&invocation) {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }

        fs::rename(&staging, &output)
            .map_err(|source| ToolchainError::Io { path: staging.clone(), source })?;
        Ok(output)
    }

    /// Run the type-checker over the host-side sources.
    pub fn type_check(&self) -> Result<(), ToolchainError> {
        let invocation = self.type_check_invocation()?;
        self.execute(&invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use std::fs::File;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Runner that records invocations and optionally writes the `-o` target.
    struct FakeRunner {
        exit: ToolExit,
        write_output: bool,
        calls: Mutex<Vec<ToolInvocation>>,
    }

    impl FakeRunner {
        fn new(exit: ToolExit, write_output: bool) -> Self {
            Self { exit, write_output, calls: Mutex::new(Vec::new()) }
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolExit> {
            self.calls.lock().unwrap().push(invocation.clone());
            if self.write_output {
                if let Some(pos) = invocation.args.iter().position(|a| a == "-o") {
                    let out = invocation.cwd.join(&invocation.args[pos + 1]);
                    fs::write(out, b"\0asm")?;
                }
            }
            Ok(self.exit)
        }
    }

    fn project(config: BuildConfig) -> (TempDir, BuildContext) {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src/c");
        fs::create_dir_all(src.join("elements/all")).unwrap();
        File::create(src.join("main.c")).unwrap();
        File::create(src.join("elements/all/sand.c")).unwrap();
        File::create(src.join("atomic.S")).unwrap();
        let ctx = BuildContext::new(config, temp.path().to_path_buf());
        (temp, ctx)
    }

    #[test]
    fn test_release_compile_args() {
        let (_temp, ctx) = project(BuildConfig::default());
        let toolchain = Toolchain::new(&ctx, &SystemRunner);
        let invocation = toolchain.compile_invocation(&ctx.wasm_path()).unwrap();

        assert_eq!(invocation.program, "clang");
        let args = &invocation.args;
        assert!(args.contains(&"--target=wasm32".to_string()));
        assert!(args.contains(&"-nostdlib".to_string()));
        assert!(args.contains(&"-O3".to_string()));
        assert!(args.contains(&"-msimd128".to_string()));
        assert!(args.contains(&"-Wl,--lto-O3".to_string()));
        assert!(args.contains(&"-flto=thin".to_string()));
        assert!(args.contains(&"-Wl,--shared-memory".to_string()));
        assert!(args.contains(&"-Wl,--export-dynamic".to_string()));
        assert!(args.contains(&format!("-Wl,--initial-memory={}", 64 * 1024 * 1024)));
        assert!(args.contains(&format!("-Wl,--max-memory={}", 64 * 1024 * 1024)));
        assert!(args.contains(&"-Wl,-z,stack-size=65536".to_string()));
        assert!(args.contains(&"-Wl,--thinlto-cache-dir=cache".to_string()));
        assert!(!args.contains(&"-gdwarf".to_string()));

        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o + 1], "build/game.wasm");
        let sources = &args[o + 2..];
        assert_eq!(sources.len(), 3);
        assert!(sources.contains(&"src/c/atomic.S".to_string()));
        assert!(sources.contains(&"src/c/elements/all/sand.c".to_string()));
    }

    #[test]
    fn test_debug_compile_args() {
        let (_temp, ctx) = project(BuildConfig { debug: true, ..Default::default() });
        let toolchain = Toolchain::new(&ctx, &SystemRunner);
        let args = toolchain.compile_invocation(&ctx.wasm_path()).unwrap().args;

        assert!(args.contains(&"-gdwarf".to_string()));
        assert!(!args.contains(&"-O3".to_string()));
        assert!(!args.contains(&"-msimd128".to_string()));
        assert!(!args.contains(&"-Wl,--lto-O3".to_string()));
    }

    #[test]
    fn test_extra_flags_precede_output() {
        let mut config = BuildConfig::default();
        config.toolchain.extra_flags = vec!["-DSEED=4".to_string()];
        let (_temp, ctx) = project(config);
        let args = Toolchain::new(&ctx, &SystemRunner).compile_invocation(&ctx.wasm_path()).unwrap().args;
        let flag = args.iter().position(|a| a == "-DSEED=4").unwrap();
        let o = args.iter().position(|a| a == "-o").unwrap();
        assert!(flag < o);
    }

    #[test]
    fn test_no_sources() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/c")).unwrap();
        let ctx = BuildContext::new(BuildConfig::default(), temp.path().to_path_buf());
        let result = Toolchain::new(&ctx, &SystemRunner).compile_invocation(&ctx.wasm_path());
        assert!(matches!(result, Err(ToolchainError::NoSources(_))));
    }

    #[test]
    fn test_type_check_invocation() {
        let mut config = BuildConfig::default();
        config.toolchain.type_checker = vec!["npx".into(), "tsc".into(), "--noEmit".into()];
        let (_temp, ctx) = project(config);
        let invocation = Toolchain::new(&ctx, &SystemRunner).type_check_invocation().unwrap();
        assert_eq!(invocation.program, "npx");
        assert_eq!(invocation.args, vec!["tsc", "--noEmit"]);
        assert_eq!(invocation.to_string(), "npx tsc --noEmit");
    }

    #[test]
    fn test_compile_success_moves_binary_into_place() {
        let (_temp, ctx) = project(BuildConfig::default());
        let runner = FakeRunner::new(ToolExit::Success, true);
        let output = Toolchain::new(&ctx, &runner).compile().unwrap();

        assert_eq!(output, ctx.wasm_path());
        assert_eq!(fs::read(&output).unwrap(), b"\0asm");
        assert!(!staging_path(&output).exists());
    }

    #[test]
    fn test_compile_failure_leaves_no_binary() {
        let (_temp, ctx) = project(BuildConfig::default());
        fs::create_dir_all(ctx.out_dir()).unwrap();
        fs::write(ctx.wasm_path(), b"stale").unwrap();

        let runner = FakeRunner::new(ToolExit::Failed(Some(1)), true);
        let err = Toolchain::new(&ctx, &runner).compile().unwrap_err();

        assert!(matches!(err, ToolchainError::Failed { code: Some(1), .. }));
        assert!(!ctx.wasm_path().exists());
        assert!(!staging_path(&ctx.wasm_path()).exists());
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_type_check_failure() {
        let (_temp, ctx) = project(BuildConfig::default());
        let runner = FakeRunner::new(ToolExit::Failed(Some(2)), false);
        let err = Toolchain::new(&ctx, &runner).type_check().unwrap_err();
        assert_eq!(err.to_string(), "type-check failed (exit code 2)");
    }

    #[test]
    fn test_spawn_failure() {
        let mut config = BuildConfig::default();
        config.toolchain.type_checker = vec!["simforge-no-such-tool-xyz".to_string()];
        let (_temp, ctx) = project(config);
        let err = Toolchain::new(&ctx, &SystemRunner).type_check().unwrap_err();
        assert!(matches!(err, ToolchainError::Spawn { .. }));
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(staging_path(Path::new("/b/game.wasm")), PathBuf::from("/b/game.wasm.partial"));
    }
}
