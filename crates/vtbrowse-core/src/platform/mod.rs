/// Collaborator interfaces — devices, filesystems, disks and the script
/// interpreter the engine hands its output to.
///
/// The engine never touches storage directly. Everything it knows about a
/// device comes through these traits, so the same sessions run against the
/// boot firmware's drivers, a host directory tree ([`host::HostPlatform`]),
/// or an in-memory mock in tests.
///
/// All calls are synchronous and blocking. Handles are plain owned values:
/// dropping a `Box<dyn Device>` or `Box<dyn Disk>` closes it.
pub mod handles;
pub mod host;

pub use handles::{FsHandle, HandleTable};
pub use host::HostPlatform;

use crate::error::PlatformError;
use crate::model::size;
use std::sync::Arc;

/// What a directory iteration reports for one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub is_dir: bool,
    /// Size in bytes, if the filesystem reports it without opening the file.
    pub size: Option<u64>,
}

/// An opened device (whole disk or partition), e.g. `hd0,1`.
pub trait Device {
    fn name(&self) -> &str;
}

/// A filesystem driver.
///
/// Drivers are long-lived and shared: the engine stores them in its
/// [`HandleTable`] and refers to them from generated menu text by handle.
pub trait FileSystem: Send + Sync {
    /// Driver name, e.g. `ntfs`, `exfat`, `ext2`.
    fn name(&self) -> &str;

    /// Call `visitor` once per child of `path` on `device`.
    ///
    /// `path` is absolute, `/`-separated; `/` is the root.
    fn dir(
        &self,
        device: &dyn Device,
        path: &str,
        visitor: &mut dyn FnMut(&str, &DirEntryInfo),
    ) -> Result<(), PlatformError>;

    /// Volume label, if the filesystem has one.
    fn label(&self, device: &dyn Device) -> Option<String>;
}

/// Device opening, filesystem detection and file access.
pub trait DeviceProvider {
    fn open_device(&self, name: &str) -> Result<Box<dyn Device>, PlatformError>;

    /// Find the driver that recognises `device`, or `None`.
    fn detect_fs(&self, device: &dyn Device) -> Option<Arc<dyn FileSystem>>;

    /// Open `path` on `device` and return its size in bytes.
    fn file_size(&self, device: &str, path: &str) -> Result<u64, PlatformError>;
}

/// Partition table scheme of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionScheme {
    Msdos,
    Gpt,
}

impl PartitionScheme {
    /// A protective MBR entry of type 0xEE means the disk is GPT.
    pub fn from_mbr_type(msdos_type: u8) -> Self {
        if msdos_type == 0xee {
            Self::Gpt
        } else {
            Self::Msdos
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Msdos => "msdos",
            Self::Gpt => "gpt",
        }
    }
}

/// One partition as reported by partition iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionInfo {
    /// Zero-based partition number; device names use `number + 1`.
    pub number: u32,
    pub scheme: PartitionScheme,
    /// Length in sectors of the disk's sector size.
    pub len_sectors: u64,
}

/// An opened whole disk.
pub trait Disk {
    fn name(&self) -> &str;

    /// log2 of the sector size (9 for 512-byte sectors).
    fn log_sector_size(&self) -> u32;

    /// Read `buf.len()` bytes starting `offset` bytes into `sector`.
    fn read(&self, sector: u64, offset: usize, buf: &mut [u8]) -> Result<(), PlatformError>;

    /// Call `visitor` once per partition, in table order.
    fn partitions(&self, visitor: &mut dyn FnMut(&PartitionInfo)) -> Result<(), PlatformError>;
}

/// Disk enumeration.
pub trait DiskProvider {
    /// Call `visitor` once per disk name.
    fn disks(&self, visitor: &mut dyn FnMut(&str));

    fn open_disk(&self, name: &str) -> Result<Box<dyn Disk>, PlatformError>;

    /// MBR signature of the disk the engine itself booted from, if known.
    fn boot_signature(&self) -> Option<u32>;
}

/// Everything a [`Browser`](crate::browser::Browser) needs from its host.
///
/// The name validator and size formatter have defaults; override them when
/// the host has its own policy.
pub trait Platform: DeviceProvider + DiskProvider {
    /// Whether `name` may be listed as a directory.
    ///
    /// The default refuses empty names and names that cannot be embedded in
    /// a quoted menu title: `"`, `\`, control characters and non-ASCII bytes.
    fn is_valid_dir_name(&self, name: &str) -> bool {
        !name.is_empty()
            && name
                .bytes()
                .all(|b| (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\')
    }

    /// Short human-readable size for menu titles.
    fn human_size(&self, bytes: u64) -> String {
        size::format_size(bytes)
    }
}

/// The menu interpreter.
///
/// `execute` may synchronously call back into the engine (a directory
/// entry re-invokes `vt_browser_dir`), so implementations usually hold a
/// shared reference to the [`Browser`](crate::browser::Browser).
pub trait ScriptExecutor {
    /// Run `script`. The slice length is the script length.
    fn execute(&mut self, script: &[u8]) -> Result<(), PlatformError>;
}

/// Collects every script it is given. Useful for tests and for printing.
#[derive(Debug, Default)]
pub struct CapturingExecutor {
    pub scripts: Vec<String>,
}

impl ScriptExecutor for CapturingExecutor {
    fn execute(&mut self, script: &[u8]) -> Result<(), PlatformError> {
        self.scripts
            .push(String::from_utf8_lossy(script).into_owned());
        Ok(())
    }
}
