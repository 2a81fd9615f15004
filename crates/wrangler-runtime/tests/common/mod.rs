//! Shared fixtures for runtime scenario tests.
//!
//! Fake toolchains are directories of `#!/bin/sh` scripts laid out like a
//! llama.cpp build. All spawns go through [`SpyLauncher`] so tests can count
//! them.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use tempfile::TempDir;
use wrangler_core::{EventSink, HttpProbe, OrchestratorEvent, ProbeError, Settings};
use wrangler_runtime::process::{ExitWatcher, ProcessError};
use wrangler_runtime::{LaunchSpec, ProcessHandle, ProcessLauncher, RetryPolicy, SupervisorOptions};

pub const LIST: &str = r#"{"object":"list","data":[]}"#;

/// Server that stays up until signalled.
pub const IDLE_SERVER: &str = "exec sleep 30";

mock! {
    pub Probe {}

    #[async_trait]
    impl HttpProbe for Probe {
        async fn get(&self, url: &str) -> Result<String, ProbeError>;
    }
}

pub fn ready_probe() -> Arc<MockProbe> {
    let mut probe = MockProbe::new();
    probe.expect_get().returning(|_| Ok(LIST.to_string()));
    Arc::new(probe)
}

pub fn refusing_probe() -> Arc<MockProbe> {
    let mut probe = MockProbe::new();
    probe
        .expect_get()
        .returning(|_| Err(ProbeError::Connect("connection refused".to_string())));
    Arc::new(probe)
}

pub fn fast_options(max_attempts: u32) -> SupervisorOptions {
    SupervisorOptions {
        settle_delay: Duration::from_millis(50),
        readiness: RetryPolicy {
            interval: Duration::from_millis(10),
            max_attempts,
            attempt_timeout: Duration::from_millis(200),
        },
        gpu_offload: false,
    }
}

pub fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Toolchain root with a `llama-server` running `server_body` and a
/// `llama-quantize` running `quantize_body`.
pub fn fake_toolchain(server_body: &str, quantize_body: &str) -> TempDir {
    let root = tempfile::tempdir().unwrap();
    write_script(&root.path().join("build/bin/llama-server"), server_body);
    write_script(&root.path().join("build/bin/llama-quantize"), quantize_body);
    root
}

pub fn settings_for(toolchain: &Path, port: u16) -> Settings {
    Settings {
        server_port: port,
        toolchain_root: toolchain.to_path_buf(),
        alt_root: toolchain.join("no-alt-install"),
        models_dir: toolchain.join("models"),
        scripts_dir: toolchain.join("scripts"),
        ..Settings::default()
    }
}

/// A port nothing is listening on right now.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind(("0.0.0.0", 0)).unwrap();
    listener.local_addr().unwrap().port()
}

pub fn model_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"GGUF").unwrap();
    path
}

/// Real launcher that records every spawn.
#[derive(Default)]
pub struct SpyLauncher {
    spawned: Mutex<Vec<(LaunchSpec, ExitWatcher)>>,
}

impl SpyLauncher {
    pub fn count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    pub fn spec(&self, index: usize) -> LaunchSpec {
        self.spawned.lock().unwrap()[index].0.clone()
    }

    pub fn exit_watcher(&self, index: usize) -> ExitWatcher {
        self.spawned.lock().unwrap()[index].1.clone()
    }
}

impl ProcessLauncher for SpyLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<ProcessHandle, ProcessError> {
        // Freshly written scripts can briefly be "text file busy" while a
        // parallel test forks.
        let mut attempts = 0;
        let handle = loop {
            match ProcessHandle::spawn(spec) {
                Err(ProcessError::Spawn { source, .. })
                    if source.raw_os_error() == Some(26) && attempts < 10 =>
                {
                    attempts += 1;
                    std::thread::sleep(Duration::from_millis(20));
                }
                other => break other?,
            }
        };
        self.spawned
            .lock()
            .unwrap()
            .push((spec.clone(), handle.exit_watcher()));
        Ok(handle)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<OrchestratorEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<OrchestratorEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&OrchestratorEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: OrchestratorEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Poll `condition` every 10ms until it holds or `limit` elapses.
pub async fn eventually(limit: Duration, condition: impl Fn() -> bool) -> bool {
    tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}
