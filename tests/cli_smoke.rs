use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

struct CliTest {
    _tmp: TempDir,
    home: PathBuf,
}

/// Server process killed on drop if a test bails early.
struct ServerProcess(Child);

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

impl CliTest {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir().context("failed to create temp dir")?;
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).context("failed to create temporary home directory")?;
        Ok(Self { _tmp: tmp, home })
    }

    fn port_file(&self) -> PathBuf {
        self.home.join("conf").join("controlport")
    }

    fn command(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin("portctl")?;
        cmd.arg("--home").arg(&self.home);
        cmd.env_remove("PORTCTL_HOME");
        Ok(cmd)
    }

    /// Run a client command; returns (exit code, stdout).
    fn run(&self, args: &[&str]) -> Result<(i32, String)> {
        let output = self
            .command()?
            .args(args)
            .args(["--timeout", "5"])
            .output()
            .context("failed to run portctl")?;
        let code = output.status.code().context("portctl killed by signal")?;
        Ok((code, String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    fn spawn_server(&self, args: &[&str]) -> Result<ServerProcess> {
        let child = std::process::Command::new(env!("CARGO_BIN_EXE_portctl"))
            .arg("--home")
            .arg(&self.home)
            .arg("start")
            .args(args)
            .env_remove("PORTCTL_HOME")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn portctl start")?;
        Ok(ServerProcess(child))
    }

    fn wait_for_port_record(&self) -> Result<String> {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if let Ok(content) = fs::read_to_string(self.port_file()) {
                if content.ends_with('\n') {
                    return Ok(content.trim_end().to_string());
                }
            }
            thread::sleep(Duration::from_millis(20));
        }
        bail!("port record never written to {:?}", self.port_file())
    }
}

fn wait_for_exit(server: &mut ServerProcess) -> Result<i32> {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Some(status) = server.0.try_wait()? {
            return status.code().context("server killed by signal");
        }
        thread::sleep(Duration::from_millis(20));
    }
    bail!("server did not exit")
}

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[test]
fn status_of_invalid_address_is_unknown() -> Result<()> {
    let cli = CliTest::new()?;
    let (code, stdout) = cli.run(&["status", "--listen", "localhost:notaport"])?;
    assert_eq!(code, 4, "stdout:\n{}", stdout);
    Ok(())
}

#[test]
fn status_without_listener_is_not_running() -> Result<()> {
    let cli = CliTest::new()?;
    let port = free_port()?;
    let (code, stdout) = cli.run(&["status", "--listen", &format!("127.0.0.1:{}", port)])?;
    assert_eq!(code, 3, "stdout:\n{}", stdout);
    Ok(())
}

#[test]
fn start_status_stop_lifecycle() -> Result<()> {
    let cli = CliTest::new()?;
    let mut server = cli.spawn_server(&["--listen", "localhost:0"])?;

    let record = cli.wait_for_port_record()?;
    assert!(record.starts_with("localhost:"), "unexpected record {:?}", record);

    let (code, stdout) = cli.run(&["status", "--json"])?;
    assert_eq!(code, 0, "stdout:\n{}", stdout);
    let report: Value = serde_json::from_str(stdout.trim())?;
    assert_eq!(report["response"], "OK");
    assert_eq!(report["endpoint"], record.as_str());

    let (code, stdout) = cli.run(&["send", "foo"])?;
    assert_eq!(code, 0);
    assert!(stdout.contains("ERR:foo"), "stdout:\n{}", stdout);

    let (code, stdout) = cli.run(&["stop"])?;
    assert_eq!(code, 0);
    assert!(stdout.contains("OK"), "stdout:\n{}", stdout);
    assert_eq!(wait_for_exit(&mut server)?, 0);

    // the record outlives the server; nothing answers on it any more
    let (code, _) = cli.run(&["status"])?;
    assert_eq!(code, 3);
    Ok(())
}

#[cfg(unix)]
#[test]
fn stop_ends_supervised_program() -> Result<()> {
    let cli = CliTest::new()?;
    let mut server = cli.spawn_server(&["--", "sleep", "30"])?;
    cli.wait_for_port_record()?;

    let (code, _) = cli.run(&["stop"])?;
    assert_eq!(code, 0);
    assert_eq!(wait_for_exit(&mut server)?, 0);
    Ok(())
}

#[cfg(unix)]
#[test]
fn supervised_program_exit_code_is_propagated() -> Result<()> {
    let cli = CliTest::new()?;
    let mut server = cli.spawn_server(&["--", "sh", "-c", "sleep 1; exit 5"])?;
    assert_eq!(wait_for_exit(&mut server)?, 5);
    Ok(())
}
