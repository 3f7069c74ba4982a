/// Error types for the browser engine.
///
/// Three layers:
/// - [`PlatformError`] — what a collaborator (device, disk, interpreter)
///   reports back to the engine.
/// - [`BrowseError`] — what a command invocation reports to its caller.
///   Every variant aborts the invocation; nothing is handed to the
///   interpreter once one is raised.
/// - [`ConfigError`] — loading [`BrowserConfig`](crate::config::BrowserConfig).
///
/// Per-entry failures (a file that cannot be opened for its size, a name
/// the validator refuses) never surface here; the scanner drops the entry
/// and logs at `debug`.
use thiserror::Error;

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The named device, disk, partition or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Underlying I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The collaborator does not support the requested operation.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Failure of a whole `vt_browser_dir` / `vt_browser_disk` invocation.
#[derive(Debug, Error)]
pub enum BrowseError {
    /// The menu buffer could not be created or grown.
    #[error("failed to allocate {requested} bytes for the menu buffer")]
    AllocationFailure { requested: usize },

    /// The device identifier did not resolve to a usable device.
    #[error("failed to open device {device}: {source}")]
    DeviceOpen {
        device: String,
        #[source]
        source: PlatformError,
    },

    /// No filesystem driver recognised the device.
    #[error("no recognisable filesystem on {device}")]
    UnknownFilesystem { device: String },

    /// The continuation token does not parse or does not resolve.
    #[error("invalid filesystem handle {token:?}: {reason}")]
    InvalidHandle { token: String, reason: &'static str },

    /// A child could not be opened to determine its size.
    #[error("failed to open {path}: {source}")]
    ChildOpen {
        path: String,
        #[source]
        source: PlatformError,
    },

    /// Listing the requested directory failed.
    #[error("failed to read directory {path} on {device}: {source}")]
    DirectoryRead {
        device: String,
        path: String,
        #[source]
        source: PlatformError,
    },

    /// Wrong number or shape of command arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// `run_command` was called with a name this engine does not register.
    #[error("unknown command {0}")]
    UnknownCommand(String),

    /// The interpreter rejected or failed to run the generated script.
    #[error("menu script execution failed: {0}")]
    Script(#[source] PlatformError),
}

/// Failure loading browser configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON or wrong shape.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A recognised control key carried a value it cannot take.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

impl BrowseError {
    /// Non-zero status code returned by the command dispatcher.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::AllocationFailure { .. } => 1,
            Self::DeviceOpen { .. } => 2,
            Self::UnknownFilesystem { .. } => 3,
            Self::InvalidHandle { .. } => 4,
            Self::ChildOpen { .. } => 5,
            Self::DirectoryRead { .. } => 6,
            Self::InvalidArguments(_) => 7,
            Self::UnknownCommand(_) => 8,
            Self::Script(_) => 9,
        }
    }
}
