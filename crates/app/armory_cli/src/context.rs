//! Per-invocation wiring: configuration, session storage and the client.

use std::path::PathBuf;
use std::sync::Arc;

use armory_core::SessionClient;
use armory_core::config::ClientConfig;
use armory_core::navigation::{self, Navigator};
use armory_core::scan::{LineDecoder, ScanController, ScanRegion};
use armory_core::storage::{FileStore, SessionStore};
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Reports navigation requests as hints on the terminal.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn go_to(&self, path: &str) {
        match path {
            navigation::LOGIN => {
                log::info!("Sign in with `armory login` or `armory qr-login`.")
            }
            other => log::debug!("navigating to {other}"),
        }
    }
}

/// Process-wide stdin, shared by prompts and the line scanner.
type SharedStdin = Arc<Mutex<BufReader<Stdin>>>;

pub struct Context {
    pub config: ClientConfig,
    pub client: SessionClient,
    stdin: SharedStdin,
}

impl Context {
    pub fn load(backend_url: Option<&str>) -> Result<Self> {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = backend_url {
            config = config.with_backend_url(url)?;
        }
        let sessions = session_store(&config);
        let client = SessionClient::new(&config, sessions, Arc::new(LogNavigator))?;
        log::debug!("backend {}", config.backend_url);
        Ok(Self {
            config,
            client,
            stdin: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()))),
        })
    }

    pub fn sessions(&self) -> &SessionStore {
        self.client.sessions()
    }

    /// Read one line from stdin, without the line terminator.
    pub async fn read_line(&self) -> Result<String> {
        let mut line = String::new();
        self.stdin.lock().await.read_line(&mut line).await?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Scanner fed by lines typed or piped on stdin.
    pub fn stdin_scanner(&self, region: &str) -> ScanController<LineDecoder<BufReader<Stdin>>> {
        ScanController::new(
            LineDecoder::shared(Arc::clone(&self.stdin)),
            ScanRegion::new(region),
            self.config.scan.clone(),
        )
    }
}

/// Durable scope under the data directory, tab scope tied to the calling shell.
fn session_store(config: &ClientConfig) -> SessionStore {
    SessionStore::new(
        Arc::new(FileStore::new(config.durable_scope_path())),
        Arc::new(FileStore::new(tab_scope_path())),
    )
}

fn tab_scope_path() -> PathBuf {
    std::env::temp_dir().join(format!("armory-tab-{}.json", terminal_id()))
}

#[cfg(unix)]
fn terminal_id() -> u32 {
    std::os::unix::process::parent_id()
}

#[cfg(not(unix))]
fn terminal_id() -> u32 {
    std::process::id()
}

/// Token cancelled on Ctrl-C.
pub fn teardown_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupted");
            cancel.cancel();
        }
    });
    token
}
