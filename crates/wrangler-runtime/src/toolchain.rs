//! Toolchain install: clone llama.cpp and build it with CMake.
//!
//! Each step runs as a structured command. Output lines are forwarded as
//! [`OrchestratorEvent::ToolchainLog`] events.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use wrangler_core::{EventSink, OrchestratorError, OrchestratorEvent};

use crate::process::{LaunchSpec, ProcessLauncher};

/// Upstream repository cloned by the installer.
pub const UPSTREAM_REPO: &str = "https://github.com/ggerganov/llama.cpp.git";

/// One command of the install sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStep {
    pub label: &'static str,
    pub spec: LaunchSpec,
}

impl InstallStep {
    fn failed(&self, reason: impl Into<String>) -> OrchestratorError {
        OrchestratorError::InstallFailed {
            step: self.label.to_string(),
            reason: reason.into(),
        }
    }
}

/// Commands that install llama.cpp into `root`.
///
/// The clone step is skipped when `root` already holds a checkout.
pub fn install_steps(root: &Path, jobs: usize) -> Vec<InstallStep> {
    let mut steps = Vec::with_capacity(3);
    if !root.join(".git").exists() {
        steps.push(InstallStep {
            label: "clone",
            spec: LaunchSpec::new("git").args(["clone", UPSTREAM_REPO]).arg(root),
        });
    }
    steps.push(InstallStep {
        label: "configure",
        spec: LaunchSpec::new("cmake")
            .arg("-S")
            .arg(root)
            .arg("-B")
            .arg(root.join("build")),
    });
    steps.push(InstallStep {
        label: "build",
        spec: LaunchSpec::new("cmake")
            .arg("--build")
            .arg(root.join("build"))
            .args(["--config", "Release", "-j"])
            .arg(jobs.to_string()),
    });
    steps
}

/// Runs the install sequence through a [`ProcessLauncher`].
pub struct ToolchainInstaller<'a> {
    launcher: &'a dyn ProcessLauncher,
    sink: &'a dyn EventSink,
}

impl<'a> ToolchainInstaller<'a> {
    pub fn new(launcher: &'a dyn ProcessLauncher, sink: &'a dyn EventSink) -> Self {
        Self { launcher, sink }
    }

    /// Clone and build into `root`, returning `root` on success.
    ///
    /// Cancelling `cancel` terminates the running step.
    pub async fn install(&self, root: &Path, cancel: &CancellationToken) -> Result<PathBuf, OrchestratorError> {
        if let Some(parent) = root.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        for step in install_steps(root, num_cpus::get()) {
            self.run_step(&step, cancel).await?;
        }

        info!(root = %root.display(), "toolchain installed");
        Ok(root.to_path_buf())
    }

    async fn run_step(&self, step: &InstallStep, cancel: &CancellationToken) -> Result<(), OrchestratorError> {
        info!(step = step.label, program = %step.spec.program.display(), "running install step");
        self.sink.emit(OrchestratorEvent::ToolchainLog {
            line: format!("==> {}", step.label),
        });

        let mut handle = self.launcher.launch(&step.spec)?;
        let mut exit = handle.exit_watcher();

        if let Some(mut output) = handle.take_output() {
            loop {
                tokio::select! {
                    line = output.next_line() => match line {
                        Some(line) => {
                            debug!(step = step.label, line = %line.line, "install output");
                            self.sink.emit(OrchestratorEvent::ToolchainLog { line: line.line });
                        }
                        None => break,
                    },
                    () = cancel.cancelled() => {
                        handle.terminate().await;
                        return Err(step.failed("cancelled"));
                    }
                }
            }
        }

        let info = tokio::select! {
            info = exit.wait() => info,
            () = cancel.cancelled() => handle.terminate().await,
        };
        if cancel.is_cancelled() {
            return Err(step.failed("cancelled"));
        }

        match info.code {
            Some(0) => Ok(()),
            Some(code) => Err(step.failed(format!("{} exited with code {code}", step.spec.program_name()))),
            None => Err(step.failed(format!("{} was killed by a signal", step.spec.program_name()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(step: &InstallStep) -> Vec<String> {
        step.spec
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn fresh_root_is_cloned_then_built() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("llama.cpp");
        let steps = install_steps(&root, 8);

        let labels: Vec<_> = steps.iter().map(|s| s.label).collect();
        assert_eq!(labels, ["clone", "configure", "build"]);
        assert_eq!(args(&steps[0])[1], UPSTREAM_REPO);
        assert_eq!(args(&steps[2]).last().map(String::as_str), Some("8"));
        assert!(args(&steps[2]).contains(&"Release".to_string()));
    }

    #[test]
    fn existing_checkout_skips_clone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let steps = install_steps(dir.path(), 2);
        assert_eq!(steps[0].label, "configure");
    }
}
