//! Credential discovery for the local client API.
//!
//! The client writes a lockfile of the form
//! `processName:pid:port:password:protocol` next to its install. When no
//! lockfile can be read, the same information is recovered from the command
//! line of the running `LeagueClientUx` process.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use tracing::{debug, trace, warn};

/// Host the local client binds to.
pub const LOCAL_HOST: &str = "127.0.0.1";

/// Username the local client expects for HTTP Basic auth.
pub const DEFAULT_USERNAME: &str = "riot";

const LOCKFILE_NAME: &str = "lockfile";
const CLIENT_PROCESS_MARKER: &str = "LeagueClientUx";
const PORT_FLAG: &str = "--app-port=";
const TOKEN_FLAG: &str = "--remoting-auth-token=";

// ── Credentials ─────────────────────────────────────────────────────

/// Connection credentials for one connection attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// `https` in practice; `http` is honoured for plain local setups.
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Credentials for the local host with the default username.
    pub fn new(port: u16, password: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            host: LOCAL_HOST.to_string(),
            port,
            username: DEFAULT_USERNAME.to_string(),
            password: password.into(),
        }
    }

    /// Whether the connection should be made over TLS.
    pub fn is_tls(&self) -> bool {
        !self.protocol.eq_ignore_ascii_case("http")
    }

    /// Base URL of the REST interface, without a trailing slash.
    pub fn base_url(&self) -> String {
        let scheme = if self.is_tls() { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    /// URL of the event WebSocket.
    pub fn websocket_url(&self) -> String {
        let scheme = if self.is_tls() { "wss" } else { "ws" };
        format!("{scheme}://{}:{}/", self.host, self.port)
    }

    /// Value for the `Authorization` header shared by both channels.
    pub fn basic_auth_header(&self) -> String {
        let token =
            general_purpose::STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ── Parsing ─────────────────────────────────────────────────────────

/// Parse lockfile contents, returning credentials from the first well-formed line.
///
/// Lines with fewer than five colon-delimited fields, or with a non-numeric
/// port, are skipped.
pub fn parse_lockfile(contents: &str) -> Option<Credentials> {
    contents.lines().find_map(parse_lockfile_line)
}

fn parse_lockfile_line(line: &str) -> Option<Credentials> {
    let mut fields = line.split(':');
    let _name = fields.next()?;
    let _pid = fields.next()?;
    let port = fields.next()?.trim().parse::<u16>().ok()?;
    let password = fields.next()?.trim();
    let protocol = fields.next()?.trim();
    if password.is_empty() {
        return None;
    }
    let protocol = if protocol.is_empty() { "https" } else { protocol };
    Some(Credentials::new(port, password, protocol))
}

/// Extract credentials from one line of a process listing.
///
/// Only lines belonging to the `LeagueClientUx` process are considered; the
/// Riot launcher carries the same flags for its own API.
pub fn parse_command_line(line: &str) -> Option<Credentials> {
    if !line.contains(CLIENT_PROCESS_MARKER) {
        return None;
    }
    let port = flag_value(line, PORT_FLAG)?.parse::<u16>().ok()?;
    let token = flag_value(line, TOKEN_FLAG)?;
    if token.is_empty() {
        return None;
    }
    Some(Credentials::new(port, token, "https"))
}

fn flag_value<'a>(line: &'a str, flag: &str) -> Option<&'a str> {
    let start = line.find(flag)? + flag.len();
    let rest = line.get(start..)?;
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '"')
        .unwrap_or(rest.len());
    rest.get(..end)
}

// ── Discovery ───────────────────────────────────────────────────────

/// A source of connection credentials, consulted once per connection attempt.
#[async_trait]
pub trait CredentialSource: Send + Sync + 'static {
    /// Locate credentials, or `None` when the client does not appear to be running.
    async fn locate(&self) -> Option<Credentials>;
}

/// Fixed credentials, for hosts that already know where the client listens.
#[async_trait]
impl CredentialSource for Credentials {
    async fn locate(&self) -> Option<Credentials> {
        Some(self.clone())
    }
}

/// Default discovery: install-dir lockfile, then OS fallbacks, then the process table.
#[derive(Debug, Clone)]
pub struct LockfileLocator {
    install_dir: Option<PathBuf>,
    fallback_lockfiles: Vec<PathBuf>,
    scan_process: bool,
}

impl LockfileLocator {
    pub fn new(
        install_dir: Option<PathBuf>,
        fallback_lockfiles: Vec<PathBuf>,
        scan_process: bool,
    ) -> Self {
        Self {
            install_dir,
            fallback_lockfiles,
            scan_process,
        }
    }

    /// Lockfile paths in the order they are tried.
    pub fn candidate_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(self.fallback_lockfiles.len() + 1);
        if let Some(dir) = &self.install_dir {
            paths.push(dir.join(LOCKFILE_NAME));
        }
        for path in &self.fallback_lockfiles {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    async fn read_lockfile(path: &Path) -> Option<Credentials> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) => {
                trace!(path = %path.display(), "lockfile not readable: {e}");
                return None;
            }
        };
        let credentials = parse_lockfile(&contents);
        if credentials.is_none() {
            warn!(path = %path.display(), "lockfile present but malformed");
        }
        credentials
    }
}

#[async_trait]
impl CredentialSource for LockfileLocator {
    async fn locate(&self) -> Option<Credentials> {
        for path in self.candidate_paths() {
            if let Some(credentials) = Self::read_lockfile(&path).await {
                debug!(path = %path.display(), port = credentials.port, "credentials read from lockfile");
                return Some(credentials);
            }
        }
        if !self.scan_process {
            return None;
        }
        let credentials = scan_client_process().await;
        if let Some(found) = &credentials {
            debug!(port = found.port, "credentials recovered from process command line");
        }
        credentials
    }
}

/// OS specific lockfile locations tried after the configured install dir.
pub fn default_fallback_lockfiles() -> Vec<PathBuf> {
    let dirs: &[&str] = if cfg!(target_os = "windows") {
        &[
            "C:\\Riot Games\\League of Legends",
            "C:\\Program Files\\Riot Games\\League of Legends",
            "C:\\Program Files (x86)\\Riot Games\\League of Legends",
        ]
    } else if cfg!(target_os = "macos") {
        &["/Applications/League of Legends.app/Contents/LoL"]
    } else {
        &[]
    };
    dirs.iter()
        .map(|dir| PathBuf::from(dir).join(LOCKFILE_NAME))
        .collect()
}

async fn scan_client_process() -> Option<Credentials> {
    let output = match process_listing().output().await {
        Ok(output) => output,
        Err(e) => {
            debug!("process listing unavailable: {e}");
            return None;
        }
    };
    let listing = String::from_utf8_lossy(&output.stdout);
    listing.lines().find_map(parse_command_line)
}

#[cfg(target_os = "windows")]
fn process_listing() -> tokio::process::Command {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    let mut command = tokio::process::Command::new("wmic");
    command
        .args([
            "process",
            "where",
            "name='LeagueClientUx.exe'",
            "get",
            "commandline",
        ])
        .creation_flags(CREATE_NO_WINDOW);
    command
}

#[cfg(not(target_os = "windows"))]
fn process_listing() -> tokio::process::Command {
    let mut command = tokio::process::Command::new("ps");
    command.args(["-A", "-o", "args"]);
    command
}
