use super::{Engine, types::*};
use crate::config::Config;
use anyhow::{Context, Result, anyhow, bail};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const RUNNER_SCRIPT: &str = "docling_export.py";

/// Drives Docling through a Python runner script: one process per request,
/// JSON request on stdin, JSON response on stdout.
pub struct PythonEngine {
    cfg: Config,
    runner: PathBuf,
    python_exe: PathBuf,
}

impl PythonEngine {
    pub fn new(cfg: &Config) -> Result<Self> {
        let runner = PathBuf::from(&cfg.paths.scripts_dir).join(RUNNER_SCRIPT);
        if !runner.exists() {
            bail!("missing runner script: {}", runner.display());
        }
        let python_exe = resolve_python_exe(&cfg.docling.python_exe);
        Ok(Self {
            cfg: cfg.clone(),
            runner,
            python_exe,
        })
    }

    fn run_script(
        &self,
        request: &serde_json::Value,
        timeout_seconds: u64,
    ) -> Result<Vec<u8>> {
        debug!(
            "python run {} timeout={}s",
            self.runner.display(),
            timeout_seconds
        );
        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(&self.runner);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        for (k, v) in &self.cfg.docling.env {
            cmd.env(k, v);
        }
        if !self.cfg.paths.docling_artifacts_dir.is_empty() {
            cmd.env("DOCLING_ARTIFACTS_PATH", &self.cfg.paths.docling_artifacts_dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning python: {}", self.python_exe.display()))?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
            use std::io::Write;
            stdin.write_all(&serde_json::to_vec(request)?)?;
            stdin.flush().ok();
        }

        let timeout = (timeout_seconds > 0).then(|| Duration::from_secs(timeout_seconds));
        let output = match timeout {
            Some(limit) => wait_with_timeout(&mut child, limit)?,
            None => child
                .wait_with_output()
                .with_context(|| "waiting for python")?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "python runner failed ({}): {}",
                output.status,
                stderr.trim()
            );
        }

        if self.cfg.debug.keep_python_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("python stderr: {}", stderr.trim());
        }

        Ok(output.stdout)
    }
}

impl Engine for PythonEngine {
    fn doctor(&self) -> Result<EngineDiag> {
        let stdout = self.run_script(
            &serde_json::json!({"cmd": "doctor"}),
            self.cfg.docling.doctor_timeout_seconds,
        )?;
        serde_json::from_slice(&stdout).with_context(|| "parsing doctor response")
    }

    fn convert(&self, req: &ConvertRequest) -> Result<DocumentExports> {
        let stdout = self.run_script(
            &serde_json::json!({"cmd": "convert", "req": req}),
            self.cfg.docling.convert_timeout_seconds,
        )?;
        let resp: ConvertResponse =
            serde_json::from_slice(&stdout).with_context(|| "parsing convert response")?;

        for w in &resp.warnings {
            warn!("docling: {w}");
        }
        if !resp.ok {
            bail!(
                "docling export failed: {}",
                resp.error.as_deref().unwrap_or("unknown error")
            );
        }
        resp.exports
            .ok_or_else(|| anyhow!("docling reported ok but returned no exports"))
    }
}

fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("DOCBATCH_PYTHON") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
        }
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

// Drain pipes while waiting so verbose model logging can't deadlock the child
// on a full stdout/stderr buffer.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    let stdout_thread = drain_thread(child.stdout.take());
    let stderr_thread = drain_thread(child.stderr.take());

    let join = |t: std::thread::JoinHandle<Result<Vec<u8>>>| -> Result<Vec<u8>> {
        t.join().map_err(|_| anyhow!("pipe reader thread panicked"))?
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            return Ok(Output {
                status,
                stdout: join(stdout_thread)?,
                stderr: join(stderr_thread)?,
            });
        }

        if start.elapsed() > timeout {
            warn!("python process timed out after {:?}", timeout);
            let _ = child.kill();
            child.wait().with_context(|| "wait after kill")?;
            let stderr = join(stderr_thread)?;
            bail!(
                "python process exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&stderr)
            );
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}

fn drain_thread(
    pipe: Option<impl Read + Send + 'static>,
) -> std::thread::JoinHandle<Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).with_context(|| "read pipe")?;
        }
        Ok(buf)
    })
}
