/// vtbrowse Core — classification, ordering and rendering of boot menus.
///
/// Turns a directory of a boot volume, or the set of attached disks, into
/// a menu script and hands it to an external interpreter. All storage and
/// interpreter access goes through the traits in [`platform`], so the
/// engine runs unchanged against firmware drivers, host directories or
/// test doubles.
///
/// # Modules
///
/// - [`browser`] — The two menu commands and their dispatcher.
/// - [`classifier`] — Which directory children are listed, and as what.
/// - [`config`] — Filters, ordering and menu identifiers.
/// - [`error`] — Error types for commands, collaborators and config.
/// - [`model`] — Entries, the entry registry and the menu buffer.
/// - [`platform`] — Collaborator traits, continuation handles, host backend.
/// - [`render`] — Menu-entry fragments and script submission.
/// - [`scanner`] — Directory and disk scan sessions.
pub mod browser;
pub mod classifier;
pub mod config;
pub mod error;
pub mod model;
pub mod platform;
pub mod render;
pub mod scanner;

pub use browser::{Browser, CMD_BROWSE_DIR, CMD_BROWSE_DISK};
pub use config::BrowserConfig;
pub use error::{BrowseError, ConfigError, PlatformError};
