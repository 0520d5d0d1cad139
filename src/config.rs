//! Application home and the paths derived from it.
//!
//! CHANGELOG:
//! - 10/19/2026 - Initial implementation

use std::path::{Path, PathBuf};

use crate::control::store::PORT_FILE_NAME;

/// Environment variable overriding the default application home.
pub const HOME_ENV: &str = "PORTCTL_HOME";

/// Directory name used under the user's home directory.
const DEFAULT_HOME_DIR: &str = ".portctl";

/// Resolve the application home.
///
/// Tries, in order:
/// 1. the explicit `--home` value
/// 2. PORTCTL_HOME env var
/// 3. `~/.portctl`
/// 4. `./.portctl`
///
/// Relative results are anchored at the current directory.
pub fn resolve_home(explicit: Option<&str>) -> PathBuf {
    let home = resolve_home_from(explicit, std::env::var(HOME_ENV).ok(), dirs::home_dir());
    if home.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            return cwd.join(home);
        }
    }
    home
}

fn resolve_home_from(
    explicit: Option<&str>,
    env: Option<String>,
    user_home: Option<PathBuf>,
) -> PathBuf {
    if let Some(path) = explicit.map(str::to_string).or(env).filter(|p| !p.is_empty()) {
        return PathBuf::from(shellexpand::tilde(&path).into_owned());
    }

    user_home
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_HOME_DIR)
}

/// Files kept under the application home.
#[derive(Debug, Clone)]
pub struct AppPaths {
    home: PathBuf,
}

impl AppPaths {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.home.join("conf")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    /// Persisted control port record.
    pub fn port_file(&self) -> PathBuf {
        self.conf_dir().join(PORT_FILE_NAME)
    }

    /// Pid file written in detached mode.
    pub fn pid_file(&self) -> PathBuf {
        self.conf_dir().join("portctl.pid")
    }

    /// stderr destination in detached mode.
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("portctl.log")
    }
}
