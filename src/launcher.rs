//! Spawning the server under test and waiting for it to come up.

use crate::{
    client::{ServerClient, READY_PROBE_TIMEOUT},
    config::{DEFAULT_HOST, DEFAULT_PORT},
    error::{KitError, Result},
};
use std::env;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub const READY_ATTEMPTS: u32 = 50;
pub const READY_DELAY: Duration = Duration::from_millis(300);
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_POLL: Duration = Duration::from_millis(50);

/// How to start the server process.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub host: String,
    pub port: u16,
    /// Exported as `SERVICE_URL` unless the environment already has one.
    pub service_url: Option<String>,
    pub attempts: u32,
    pub delay: Duration,
}

impl LaunchConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            service_url: None,
            attempts: READY_ATTEMPTS,
            delay: READY_DELAY,
        }
    }

    /// Splits a command line such as `"python serverasync.py"` on whitespace.
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| KitError::ConfigError("empty server command".into()))?;
        Ok(Self::new(program).with_args(parts.map(String::from)))
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    pub fn with_bind(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    pub fn with_readiness(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts = attempts;
        self.delay = delay;
        self
    }
}

/// A running server child process. Dropping the handle stops it.
pub struct ServerProcess {
    child: Child,
}

impl ServerProcess {
    pub fn spawn(config: &LaunchConfig) -> Result<Self> {
        log::info!(
            "🚀 Starting server: {} {} on {}:{}",
            config.program.display(),
            config.args.join(" "),
            config.host,
            config.port
        );

        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .env("HOST", &config.host)
            .env("PORT", config.port.to_string())
            .stdin(Stdio::null());

        if env::var_os("SERVICE_URL").is_none() {
            if let Some(url) = &config.service_url {
                cmd.env("SERVICE_URL", url);
            }
        }

        let child = cmd.spawn().map_err(|e| {
            KitError::Spawn(format!(
                "failed to spawn {}: {}",
                config.program.display(),
                e
            ))
        })?;

        Ok(Self { child })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Kills the child and waits up to [`STOP_TIMEOUT`] for it to exit.
    pub async fn stop(&mut self) {
        if !self.kill() {
            return;
        }
        let deadline = Instant::now() + STOP_TIMEOUT;
        while Instant::now() < deadline {
            match self.child.try_wait() {
                Ok(Some(_)) | Err(_) => return,
                Ok(None) => sleep(STOP_POLL).await,
            }
        }
        log::warn!("Server (pid: {}) did not exit in time", self.child.id());
    }

    /// Sends the kill signal. Returns false when the child had already exited.
    fn kill(&mut self) -> bool {
        if let Ok(Some(_)) = self.child.try_wait() {
            return false;
        }
        log::info!("Stopping server (pid: {})", self.child.id());
        let _ = self.child.kill();
        true
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        // No waiting here; `stop` is the orderly path.
        if self.kill() {
            let _ = self.child.try_wait();
        }
    }
}

/// Polls `/api/status` until it answers 200 or the attempt budget runs out.
pub async fn wait_until_ready(client: &ServerClient, attempts: u32, delay: Duration) -> Result<()> {
    for attempt in 1..=attempts {
        match client.status(READY_PROBE_TIMEOUT).await {
            Ok(()) => {
                log::debug!("Server ready after {} attempt(s)", attempt);
                return Ok(());
            }
            Err(e) => {
                if attempt == 1 {
                    log::info!("Waiting for server to start...");
                }
                log::trace!("Readiness probe {} failed: {}", attempt, e);
                sleep(delay).await;
            }
        }
    }
    Err(KitError::Startup(format!(
        "no healthy status after {} attempts",
        attempts
    )))
}

/// Spawns the server described by `config` and waits until `client` sees it ready.
pub async fn launch(config: &LaunchConfig, client: &ServerClient) -> Result<ServerProcess> {
    let mut process = ServerProcess::spawn(config)?;
    if let Err(e) = wait_until_ready(client, config.attempts, config.delay).await {
        process.stop().await;
        return Err(e);
    }
    log::info!("✅ Server is ready (pid: {})", process.id());
    Ok(process)
}
