//! Build progress reporting.
//!
//! Stage-by-stage progress is reported through a [`ProgressReporter`].
//! The console reporter prints one line per stage and the timings at the end.

use crate::build::result::Stage;
use std::io::Write;
use std::sync::Mutex;

/// Outcome of a stage in progress events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    /// Stage completed
    Success,
    /// Stage failed with error
    Failed(String),
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Success => write!(f, "success"),
            StageStatus::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Events that can be reported during a build.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Build started
    BuildStarted {
        /// Whether the output directory is wiped first
        clean: bool,
    },
    /// A stage started
    StageStarted {
        /// Stage identifier
        stage: Stage,
    },
    /// A stage completed
    StageCompleted {
        /// Stage identifier
        stage: Stage,
        /// Outcome
        status: StageStatus,
    },
    /// Build completed
    BuildCompleted {
        /// Whether the overall build succeeded
        success: bool,
        /// Named timings in milliseconds (external tools, then total)
        timings: Vec<(String, f64)>,
    },
    /// A warning was generated
    Warning {
        /// Warning message
        message: String,
    },
}

/// Trait for progress reporters.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    /// Create a new null progress reporter.
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Console progress reporter with optional colors.
pub struct ConsoleProgress {
    /// Whether to use colors
    use_colors: bool,
    /// Output writer (for testing)
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress").field("use_colors", &self.use_colors).finish()
    }
}

impl ConsoleProgress {
    /// Create a new console progress reporter writing to stderr.
    pub fn new() -> Self {
        Self { use_colors: true, output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a console progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self {
            use_colors: false, // Disable colors for custom output
            output: Mutex::new(Box::new(output)),
        }
    }

    /// Set whether to use colors.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.color(text, "\x1b[32m")
    }

    fn yellow(&self, text: &str) -> String {
        self.color(text, "\x1b[33m")
    }

    fn red(&self, text: &str) -> String {
        self.color(text, "\x1b[31m")
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted { clean } => {
                if clean {
                    self.writeln(&format!("{} clean build", self.cyan("[build]")));
                }
            }
            ProgressEvent::StageStarted { stage } => {
                self.writeln(&format!("{} --{}--", self.cyan("[build]"), stage.description()));
            }
            ProgressEvent::StageCompleted { stage, status } => {
                if let StageStatus::Failed(err) = status {
                    self.writeln(&format!("{} {} {}", self.cyan("[build]"), self.red("FAILED"), stage));
                    self.writeln(&format!("        {}", self.red(&err)));
                }
            }
            ProgressEvent::BuildCompleted { success, timings } => {
                if success {
                    self.writeln(&format!("{} ----build finished----", self.green("[done]")));
                    self.writeln("--timings--");
                    for (name, ms) in timings {
                        self.writeln(&format!("{}:{:.3}ms", name, ms));
                    }
                    self.writeln("--timings--");
                } else {
                    self.writeln(&format!("{} Build failed", self.red("[error]")));
                }
            }
            ProgressEvent::Warning { message } => {
                self.writeln(&format!("{} {}", self.yellow("[warn]"), message));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Success.to_string(), "success");
        assert_eq!(StageStatus::Failed("boom".to_string()).to_string(), "failed: boom");
    }

    #[test]
    fn test_console_stage_messages() {
        let buffer = SharedBuffer::default();
        let progress = ConsoleProgress::with_output(buffer.clone());

        progress.report(ProgressEvent::StageStarted { stage: Stage::Header });
        progress.report(ProgressEvent::StageCompleted {
            stage: Stage::Header,
            status: StageStatus::Success,
        });

        let out = buffer.contents();
        assert_eq!(out, "[build] --generating elementdata.h--\n");
    }

    #[test]
    fn test_console_failure() {
        let buffer = SharedBuffer::default();
        let progress = ConsoleProgress::with_output(buffer.clone());

        progress.report(ProgressEvent::StageCompleted {
            stage: Stage::Compile,
            status: StageStatus::Failed("compiler failed (exit code 1)".to_string()),
        });
        progress.report(ProgressEvent::BuildCompleted { success: false, timings: vec![] });

        let out = buffer.contents();
        assert!(out.contains("FAILED compile"));
        assert!(out.contains("compiler failed (exit code 1)"));
        assert!(out.contains("Build failed"));
        assert!(!out.contains("--timings--"));
    }

    #[test]
    fn test_console_timings() {
        let buffer = SharedBuffer::default();
        let progress = ConsoleProgress::with_output(buffer.clone());

        progress.report(ProgressEvent::BuildCompleted {
            success: true,
            timings: vec![("compile".to_string(), 812.5), ("total".to_string(), 1000.0)],
        });

        let out = buffer.contents();
        assert!(out.contains("----build finished----"));
        assert!(out.contains("compile:812.500ms\n"));
        assert!(out.contains("total:1000.000ms\n"));
    }

    #[test]
    fn test_console_colors() {
        let buffer = SharedBuffer::default();
        let progress = ConsoleProgress::with_output(buffer.clone()).with_colors(true);
        progress.report(ProgressEvent::Warning { message: "careful".to_string() });
        assert!(buffer.contents().contains("\x1b[33m[warn]\x1b[0m careful"));
    }

    #[test]
    fn test_null_progress() {
        let progress = NullProgress::new();
        progress.report(ProgressEvent::BuildStarted { clean: true });
    }
}
