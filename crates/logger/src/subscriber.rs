use std::env::var;
use std::ffi::OsString;
use std::fs::{File, OpenOptions, create_dir_all};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    Layer, Registry, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Appends to the file, creating parent directories as needed
    File(PathBuf),
    /// No subscriber is installed
    Disabled,
}

/// Installs the global subscriber. `RUST_LOG` overrides the INFO default and
/// `RUST_LOG_FORMAT=json` switches to JSON lines.
pub fn init(target: LogTarget) -> io::Result<()> {
    initialize_tracing(target, LevelFilter::INFO)
}

fn initialize_tracing(target: LogTarget, level: LevelFilter) -> io::Result<()> {
    let json = var("RUST_LOG_FORMAT").is_ok_and(|format| format == "json");

    let log_layer = match target {
        LogTarget::Disabled => return Ok(()),
        LogTarget::Stderr => build_layer(io::stderr, json, true, level),
        LogTarget::File(path) => build_layer(Mutex::new(open_log_file(&path)?), json, false, level),
    };

    tracing_subscriber::registry().with(log_layer).try_init().map_err(io::Error::other)
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn build_layer<W>(writer: W, json: bool, ansi: bool, level: LevelFilter) -> BoxedLayer
where
    W: for<'a> tracing_subscriber::fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    if json {
        tracing_subscriber::fmt::layer().json().with_writer(writer).with_filter(env_filter).boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(ansi)
            .with_target(false)
            .with_writer(writer)
            .with_filter(env_filter)
            .boxed()
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// `$XDG_STATE_HOME/netpulse/netpulse.log`, falling back to
/// `~/.local/state/netpulse/netpulse.log`
pub fn default_log_path() -> Option<PathBuf> {
    log_path_from(std::env::var_os("XDG_STATE_HOME"), std::env::var_os("HOME"))
}

fn log_path_from(state_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    let state_dir = state_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home.map(|home| PathBuf::from(home).join(".local").join("state")))?;

    Some(state_dir.join("netpulse").join("netpulse.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_log_path_prefers_state_home() {
        let path = log_path_from(Some("/var/state".into()), Some("/home/me".into()));
        assert_eq!(path, Some(PathBuf::from("/var/state/netpulse/netpulse.log")));
    }

    #[test]
    fn test_log_path_falls_back_to_home() {
        let path = log_path_from(Some("".into()), Some("/home/me".into()));
        assert_eq!(path, Some(PathBuf::from("/home/me/.local/state/netpulse/netpulse.log")));

        assert_eq!(log_path_from(None, None), None);
    }

    #[test]
    fn test_open_log_file_creates_parents_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("netpulse.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[test]
    fn test_disabled_target_installs_nothing() {
        assert!(init(LogTarget::Disabled).is_ok());
    }
}
