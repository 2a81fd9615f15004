//! Read-only detection of servers this orchestrator did not spawn.
//!
//! Everything here is best-effort and advisory. Lookup failures yield `None`.

use std::ffi::OsString;
use std::path::Path;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tokio::process::Command;
use tracing::debug;

/// Process found listening on a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortHolder {
    pub pid: u32,
    pub name: String,
    pub cmd: Vec<String>,
}

impl std::fmt::Display for PortHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (pid {})", self.name, self.pid)
    }
}

/// PID of the process listening on `port`, via `lsof`.
async fn listening_pid(port: u16) -> Option<u32> {
    let output = Command::new("lsof")
        .arg("-t")
        .arg("-i")
        .arg(format!("tcp:{port}"))
        .arg("-sTCP:LISTEN")
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| debug!(port = %port, error = %e, "lsof unavailable"))
        .ok()?;

    // lsof exits 1 when nothing matches.
    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .find_map(|line| line.trim().parse().ok())
}

fn process_info(pid: u32) -> Option<PortHolder> {
    let sys_pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[sys_pid]),
        true,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    );
    let process = system.process(sys_pid)?;

    Some(PortHolder {
        pid,
        name: process.name().to_string_lossy().into_owned(),
        cmd: process
            .cmd()
            .iter()
            .map(|arg: &OsString| arg.to_string_lossy().into_owned())
            .collect(),
    })
}

/// Process listening on `port`, if any can be identified.
pub async fn port_holder(port: u16) -> Option<PortHolder> {
    let pid = listening_pid(port).await?;
    process_info(pid)
}

/// Model file name loaded by an inference server invocation.
///
/// The invocation must name a `llama-server` executable and carry a model
/// flag (`-m <path>`, `--model <path>` or `--model=<path>`).
pub fn model_from_cmdline(args: &[String]) -> Option<String> {
    let is_server = args.iter().any(|arg| {
        Path::new(arg)
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains("llama-server"))
    });
    if !is_server {
        return None;
    }

    let mut iter = args.iter();
    let model_path = loop {
        let arg = iter.next()?;
        if arg == "-m" || arg == "--model" {
            break iter.next()?.as_str();
        }
        if let Some(path) = arg.strip_prefix("--model=") {
            break path;
        }
    };

    Path::new(model_path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Model name served by a foreign inference server on `port`.
pub async fn detect_foreign_server(port: u16) -> Option<String> {
    let holder = port_holder(port).await?;
    let model = model_from_cmdline(&holder.cmd);
    debug!(port = %port, pid = %holder.pid, model = ?model, "inspected port holder");
    model
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn model_is_recovered_from_short_flag() {
        let cmd = args("/opt/llama.cpp/build/bin/llama-server -m /models/phi-Q4_0.gguf --port 7070");
        assert_eq!(model_from_cmdline(&cmd).as_deref(), Some("phi-Q4_0.gguf"));
    }

    #[test]
    fn model_is_recovered_from_long_flags() {
        let cmd = args("llama-server --port 7070 --model /m/a.gguf");
        assert_eq!(model_from_cmdline(&cmd).as_deref(), Some("a.gguf"));

        let cmd = args("llama-server --model=/m/b.gguf");
        assert_eq!(model_from_cmdline(&cmd).as_deref(), Some("b.gguf"));
    }

    #[test]
    fn unrelated_processes_are_ignored() {
        assert_eq!(model_from_cmdline(&args("python3 -m http.server 7070")), None);
        assert_eq!(model_from_cmdline(&args("llama-server --port 7070")), None);
        assert_eq!(model_from_cmdline(&args("llama-server -m")), None);
        assert_eq!(model_from_cmdline(&[]), None);
    }

    #[tokio::test]
    async fn unused_port_has_no_foreign_server() {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert_eq!(detect_foreign_server(port).await, None);
    }

    /// Python listener dressed up as a `llama-server` invocation.
    #[cfg(unix)]
    fn disguised_listener(port: u16) -> crate::process::LaunchSpec {
        const LISTEN: &str = "import socket, sys, time\n\
            s = socket.socket()\n\
            s.bind(('127.0.0.1', int(sys.argv[-1])))\n\
            s.listen()\n\
            time.sleep(30)\n";
        crate::process::LaunchSpec::new("python3")
            .arg("-c")
            .arg(LISTEN)
            .args(["llama-server", "-m", "/models/phi-Q4_0.gguf", "--port"])
            .arg(port.to_string())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn foreign_server_model_is_read_from_its_command_line() {
        if which::which("python3").is_err() || which::which("lsof").is_err() {
            eprintln!("python3 or lsof unavailable, skipping");
            return;
        }
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let server = crate::process::ProcessHandle::spawn(&disguised_listener(port)).unwrap();
        let mut holder = None;
        for _ in 0..50 {
            holder = port_holder(port).await;
            if holder.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }

        let holder = holder.expect("listener never showed up on the port");
        assert!(holder.cmd.iter().any(|arg| arg == "llama-server"));
        assert_eq!(detect_foreign_server(port).await.as_deref(), Some("phi-Q4_0.gguf"));

        server.terminate().await;
    }
}
