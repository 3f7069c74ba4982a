/// The browser engine — entry point for both menu commands.
///
/// A [`Browser`] owns the platform collaborators, the configuration and the
/// filesystem handle table. Commands take `&self`, so the script executor
/// can hold a shared reference to the browser and re-enter it when the
/// user picks a directory or partition entry.
///
/// Each invocation allocates its own buffer and registry, and releases
/// them (and any device it opened) on every exit path. Nothing reaches the
/// executor unless the whole menu was generated.
use crate::config::BrowserConfig;
use crate::error::BrowseError;
use crate::model::MenuBuffer;
use crate::platform::{FileSystem, FsHandle, HandleTable, Platform, ScriptExecutor};
use crate::render::{self, BackTarget, BROWSE_DIR_COMMAND};
use crate::scanner::{directory, disk, ScanContext};
use std::sync::Arc;
use tracing::{info, warn};

/// `vt_browser_dir <device> <fs-token> <path>`
pub const CMD_BROWSE_DIR: &str = BROWSE_DIR_COMMAND;

/// `vt_browser_disk`
pub const CMD_BROWSE_DISK: &str = "vt_browser_disk";

/// Boot-menu browser over a [`Platform`].
pub struct Browser<P> {
    platform: P,
    config: BrowserConfig,
    handles: HandleTable,
}

impl<P: Platform> Browser<P> {
    pub fn new(platform: P, config: BrowserConfig) -> Self {
        Self {
            platform,
            config,
            handles: HandleTable::new(),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Register a filesystem driver so menu text can refer to it.
    pub fn register_filesystem(&self, fs: Arc<dyn FileSystem>) -> FsHandle {
        self.handles.register(fs)
    }

    /// Open `device`, detect its filesystem and return the continuation
    /// token for it. Used to start browsing without going through the disk
    /// listing first.
    pub fn token_for_device(&self, device: &str) -> Result<String, BrowseError> {
        let dev = self
            .platform
            .open_device(device)
            .map_err(|source| BrowseError::DeviceOpen {
                device: device.to_string(),
                source,
            })?;
        let fs = self
            .platform
            .detect_fs(dev.as_ref())
            .ok_or_else(|| BrowseError::UnknownFilesystem {
                device: device.to_string(),
            })?;
        Ok(self.register_filesystem(fs).to_token())
    }

    /// List `path` on `device` with the filesystem behind `token` and run
    /// the resulting menu.
    pub fn browse_directory(
        &self,
        device: &str,
        token: &str,
        path: &str,
        executor: &mut dyn ScriptExecutor,
    ) -> Result<(), BrowseError> {
        let mut buf = MenuBuffer::with_default_capacity()?;
        let (handle, fs) = self.handles.resolve_token(token)?;
        let dev = self
            .platform
            .open_device(device)
            .map_err(|source| BrowseError::DeviceOpen {
                device: device.to_string(),
                source,
            })?;

        let ctx = ScanContext::new(device, handle, path, &self.config);
        let (mut registry, stats) =
            directory::scan_directory(&self.platform, fs.as_ref(), dev.as_ref(), &ctx)?;
        drop(dev);
        info!(
            "{device}{}: {} directories, {} files, {} skipped",
            ctx.dir_path(),
            stats.directories,
            stats.files,
            stats.rejected
        );

        render::render_directory(&mut registry, &mut buf)?;
        render::submit(buf, executor)
    }

    /// List the partitions of every attached hard disk and run the menu.
    pub fn browse_disks(&self, executor: &mut dyn ScriptExecutor) -> Result<(), BrowseError> {
        let mut buf = MenuBuffer::with_default_capacity()?;
        render::back_entry(&mut buf, BackTarget::Return)?;
        let stats = disk::scan_disks(&self.platform, &self.handles, &self.config, &mut buf)?;
        info!(
            "{} disks, {} partitions ({} unsupported)",
            stats.disks, stats.partitions, stats.unsupported
        );
        render::submit(buf, executor)
    }

    /// Dispatch a command by name, as the interpreter calls it.
    ///
    /// Returns 0 on success and the error's status code otherwise.
    pub fn run_command(&self, name: &str, args: &[&str], executor: &mut dyn ScriptExecutor) -> i32 {
        let result = match name {
            CMD_BROWSE_DIR => match args {
                [device, token, path] => self.browse_directory(device, token, path, executor),
                _ => Err(BrowseError::InvalidArguments(format!(
                    "{CMD_BROWSE_DIR} expects <device> <fs-token> <path>, got {} arguments",
                    args.len()
                ))),
            },
            CMD_BROWSE_DISK => self.browse_disks(executor),
            other => Err(BrowseError::UnknownCommand(other.to_string())),
        };

        match result {
            Ok(()) => 0,
            Err(e) => {
                warn!("{name} {}: {e}", args.join(" "));
                e.status_code()
            }
        }
    }
}
