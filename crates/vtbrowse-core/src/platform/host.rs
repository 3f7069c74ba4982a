/// Host-directory platform — serves ordinary directories as boot volumes.
///
/// Each registered volume maps a device name such as `hd0,1` to a
/// directory on the host. Volumes belong to virtual disks (`hd0`, `hd1`, …)
/// whose sector 0 is synthesised with a configurable MBR signature, so the
/// disk listing's self-exclusion can be exercised without raw devices.
///
/// Directory listing uses `jwalk` restricted to depth 1 with serial
/// traversal: the engine is single-threaded and only ever needs one level.
use super::{
    DirEntryInfo, Device, DeviceProvider, Disk, DiskProvider, FileSystem, PartitionInfo,
    PartitionScheme, Platform,
};
use crate::error::PlatformError;
use crate::scanner::disk::MBR_SIGNATURE_OFFSET;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Driver name reported by the host filesystem.
pub const HOST_FS_NAME: &str = "hostfs";

const SECTOR_SIZE: usize = 512;
const LOG_SECTOR_SIZE: u32 = 9;

#[derive(Debug, Clone)]
struct HostVolume {
    root: PathBuf,
    label: Option<String>,
}

/// The single `hostfs` driver shared by every host volume.
#[derive(Debug, Default)]
pub struct HostFs {
    volumes: RwLock<BTreeMap<String, HostVolume>>,
}

impl HostFs {
    fn volume(&self, device: &str) -> Result<HostVolume, PlatformError> {
        self.volumes
            .read()
            .get(device)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(device.to_string()))
    }

    fn contains(&self, device: &str) -> bool {
        self.volumes.read().contains_key(device)
    }
}

/// Resolve a `/`-separated volume path below `root`.
fn host_path(root: &Path, path: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for part in path.split('/').filter(|p| !p.is_empty()) {
        out.push(part);
    }
    out
}

fn io_error(path: &Path, source: io::Error) -> PlatformError {
    PlatformError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl FileSystem for HostFs {
    fn name(&self) -> &str {
        HOST_FS_NAME
    }

    fn dir(
        &self,
        device: &dyn Device,
        path: &str,
        visitor: &mut dyn FnMut(&str, &DirEntryInfo),
    ) -> Result<(), PlatformError> {
        let volume = self.volume(device.name())?;
        let target = host_path(&volume.root, path);

        let meta = std::fs::metadata(&target).map_err(|e| io_error(&target, e))?;
        if !meta.is_dir() {
            return Err(PlatformError::NotFound(target.display().to_string()));
        }

        let walker = jwalk::WalkDir::new(&target)
            .min_depth(1)
            .max_depth(1)
            .skip_hidden(false)
            .follow_links(false)
            .sort(false)
            .parallelism(jwalk::Parallelism::Serial);

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) if err.depth() == 0 || err.path() == Some(target.as_path()) => {
                    // The directory itself could not be read.
                    return Err(io_error(&target, io::Error::from(err)));
                }
                Err(err) => {
                    debug!("skipping unreadable entry under {}: {err}", target.display());
                    continue;
                }
            };

            let Some(name) = entry.file_name().to_str() else {
                debug!(
                    "skipping non UTF-8 name {:?} under {}",
                    entry.file_name(),
                    target.display()
                );
                continue;
            };

            let info = if entry.path_is_symlink() {
                // Links report their target, like the size lookup does.
                match std::fs::metadata(entry.path()) {
                    Ok(meta) => DirEntryInfo {
                        is_dir: meta.is_dir(),
                        size: (!meta.is_dir()).then(|| meta.len()),
                    },
                    Err(err) => {
                        debug!("skipping dangling link {name:?}: {err}");
                        continue;
                    }
                }
            } else {
                let is_dir = entry.file_type().is_dir();
                DirEntryInfo {
                    is_dir,
                    size: if is_dir {
                        None
                    } else {
                        entry.metadata().ok().map(|m| m.len())
                    },
                }
            };
            visitor(name, &info);
        }
        Ok(())
    }

    fn label(&self, device: &dyn Device) -> Option<String> {
        self.volume(device.name()).ok().and_then(|v| v.label)
    }
}

/// An opened host device. Carries only its name; volume data lives in
/// [`HostFs`].
#[derive(Debug)]
struct HostDevice {
    name: String,
}

impl Device for HostDevice {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A virtual disk grouping host volumes.
#[derive(Debug, Clone)]
pub struct HostDisk {
    name: String,
    signature: u32,
    /// Volume device names, in partition order.
    volumes: Vec<String>,
    fs: Arc<HostFs>,
}

impl HostDisk {
    /// Total bytes of regular files below `root`, rounded up to whole sectors.
    fn volume_sectors(&self, device: &str) -> u64 {
        let Ok(volume) = self.fs.volume(device) else {
            return 0;
        };
        let bytes: u64 = jwalk::WalkDir::new(&volume.root)
            .skip_hidden(false)
            .follow_links(false)
            .parallelism(jwalk::Parallelism::Serial)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum();
        bytes.div_ceil(SECTOR_SIZE as u64)
    }
}

impl Disk for HostDisk {
    fn name(&self) -> &str {
        &self.name
    }

    fn log_sector_size(&self) -> u32 {
        LOG_SECTOR_SIZE
    }

    fn read(&self, sector: u64, offset: usize, buf: &mut [u8]) -> Result<(), PlatformError> {
        let end = offset
            .checked_add(buf.len())
            .filter(|&end| end <= SECTOR_SIZE)
            .ok_or_else(|| {
                PlatformError::Unsupported(format!(
                    "read of {} bytes at offset {offset} crosses a sector boundary",
                    buf.len()
                ))
            })?;

        let mut data = [0u8; SECTOR_SIZE];
        if sector == 0 {
            data[MBR_SIGNATURE_OFFSET..MBR_SIGNATURE_OFFSET + 4]
                .copy_from_slice(&self.signature.to_le_bytes());
        }
        buf.copy_from_slice(&data[offset..end]);
        Ok(())
    }

    fn partitions(&self, visitor: &mut dyn FnMut(&PartitionInfo)) -> Result<(), PlatformError> {
        for (i, device) in self.volumes.iter().enumerate() {
            visitor(&PartitionInfo {
                number: i as u32,
                scheme: PartitionScheme::Msdos,
                len_sectors: self.volume_sectors(device),
            });
        }
        Ok(())
    }
}

/// Host directories presented as devices, disks and one filesystem.
#[derive(Debug, Default)]
pub struct HostPlatform {
    fs: Arc<HostFs>,
    disks: BTreeMap<String, HostDisk>,
    boot_signature: Option<u32>,
}

impl HostPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a standalone volume under `device` (no owning disk).
    pub fn add_volume(&mut self, device: &str, root: impl Into<PathBuf>, label: Option<&str>) {
        self.fs.volumes.write().insert(
            device.to_string(),
            HostVolume {
                root: root.into(),
                label: label.map(str::to_string),
            },
        );
    }

    /// Create (or re-sign) virtual disk `name` with MBR `signature`.
    pub fn add_disk(&mut self, name: &str, signature: u32) {
        let fs = self.fs.clone();
        self.disks
            .entry(name.to_string())
            .and_modify(|d| d.signature = signature)
            .or_insert_with(|| HostDisk {
                name: name.to_string(),
                signature,
                volumes: Vec::new(),
                fs,
            });
    }

    /// Append a partition backed by `root` to disk `disk` and return its
    /// device name (`<disk>,<n>`, 1-based). Creates the disk with a zero
    /// signature if it does not exist yet.
    pub fn add_partition(
        &mut self,
        disk: &str,
        root: impl Into<PathBuf>,
        label: Option<&str>,
    ) -> String {
        if !self.disks.contains_key(disk) {
            self.add_disk(disk, 0);
        }
        let number = self.disks.get(disk).map_or(0, |d| d.volumes.len()) + 1;
        let device = format!("{disk},{number}");
        self.add_volume(&device, root, label);
        if let Some(d) = self.disks.get_mut(disk) {
            d.volumes.push(device.clone());
        }
        device
    }

    /// Mark the disk the engine "booted" from by its MBR signature.
    pub fn set_boot_signature(&mut self, signature: u32) {
        self.boot_signature = Some(signature);
    }
}

impl DeviceProvider for HostPlatform {
    fn open_device(&self, name: &str) -> Result<Box<dyn Device>, PlatformError> {
        if self.fs.contains(name) || self.disks.contains_key(name) {
            Ok(Box::new(HostDevice {
                name: name.to_string(),
            }))
        } else {
            Err(PlatformError::NotFound(name.to_string()))
        }
    }

    fn detect_fs(&self, device: &dyn Device) -> Option<Arc<dyn FileSystem>> {
        if self.fs.contains(device.name()) {
            Some(self.fs.clone())
        } else {
            None
        }
    }

    fn file_size(&self, device: &str, path: &str) -> Result<u64, PlatformError> {
        let volume = self.fs.volume(device)?;
        let target = host_path(&volume.root, path);
        let meta = std::fs::metadata(&target).map_err(|e| io_error(&target, e))?;
        if meta.is_file() {
            Ok(meta.len())
        } else {
            Err(PlatformError::NotFound(target.display().to_string()))
        }
    }
}

impl DiskProvider for HostPlatform {
    fn disks(&self, visitor: &mut dyn FnMut(&str)) {
        for name in self.disks.keys() {
            visitor(name);
        }
    }

    fn open_disk(&self, name: &str) -> Result<Box<dyn Disk>, PlatformError> {
        self.disks
            .get(name)
            .cloned()
            .map(|d| Box::new(d) as Box<dyn Disk>)
            .ok_or_else(|| PlatformError::NotFound(name.to_string()))
    }

    fn boot_signature(&self) -> Option<u32> {
        self.boot_signature
    }
}

impl Platform for HostPlatform {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn collect(fs: &HostFs, device: &dyn Device, path: &str) -> Vec<(String, DirEntryInfo)> {
        let mut out = Vec::new();
        fs.dir(device, path, &mut |name, info| out.push((name.to_string(), *info)))
            .unwrap();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    #[test]
    fn dir_lists_one_level_with_sizes() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("sub").join("deep.iso"), [0u8; 10]).unwrap();
        fs::write(tmp.path().join("a.iso"), [0u8; 4096]).unwrap();

        let mut host = HostPlatform::new();
        host.add_volume("hd0,1", tmp.path(), Some("DATA"));
        let dev = host.open_device("hd0,1").unwrap();
        let fs = host.detect_fs(dev.as_ref()).unwrap();
        assert_eq!(fs.name(), HOST_FS_NAME);
        assert_eq!(fs.label(dev.as_ref()).as_deref(), Some("DATA"));

        let mut seen = Vec::new();
        fs.dir(dev.as_ref(), "/", &mut |n, i| seen.push((n.to_string(), *i)))
            .unwrap();
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(seen.len(), 2, "depth must be limited to one level");
        assert_eq!(seen[0].0, "a.iso");
        assert_eq!(seen[0].1.size, Some(4096));
        assert!(seen[1].1.is_dir);

        let sub = collect(&host.fs, dev.as_ref(), "/sub");
        assert_eq!(sub.len(), 1);
        assert_eq!(sub[0].0, "deep.iso");
    }

    #[test]
    fn dir_on_missing_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut host = HostPlatform::new();
        host.add_volume("hd0,1", tmp.path(), None);
        let dev = host.open_device("hd0,1").unwrap();
        let fs = host.detect_fs(dev.as_ref()).unwrap();
        assert!(fs.dir(dev.as_ref(), "/nope", &mut |_, _| {}).is_err());
    }

    /// A directory that exists but cannot be listed is an error, not an
    /// empty listing.
    #[cfg(unix)]
    #[test]
    fn dir_on_unreadable_path_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("a.iso"), [0u8; 4096]).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o311)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Privileged users bypass directory permissions.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut host = HostPlatform::new();
        host.add_volume("hd0,1", tmp.path(), None);
        let dev = host.open_device("hd0,1").unwrap();
        let mut seen = Vec::new();
        let result = host
            .fs
            .dir(dev.as_ref(), "/locked", &mut |n, _| seen.push(n.to_string()));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(PlatformError::Io { .. })), "{result:?}");
        assert!(seen.is_empty());
    }

    /// Links are listed as what they point to.
    #[cfg(unix)]
    #[test]
    fn dir_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let store = TempDir::new().unwrap();
        fs::write(store.path().join("real.iso"), [0u8; 4096]).unwrap();
        fs::create_dir(store.path().join("images")).unwrap();
        symlink(store.path().join("real.iso"), tmp.path().join("linked.iso")).unwrap();
        symlink(store.path().join("images"), tmp.path().join("linked-dir")).unwrap();
        symlink(store.path().join("gone.iso"), tmp.path().join("dangling.iso")).unwrap();

        let mut host = HostPlatform::new();
        host.add_volume("hd0,1", tmp.path(), None);
        let dev = host.open_device("hd0,1").unwrap();
        let seen = collect(&host.fs, dev.as_ref(), "/");

        assert_eq!(seen.len(), 2, "dangling links are skipped");
        assert_eq!(seen[0].0, "linked-dir");
        assert!(seen[0].1.is_dir);
        assert_eq!(seen[1].0, "linked.iso");
        assert_eq!(seen[1].1.size, Some(4096));
    }

    /// Names that are not UTF-8 cannot be rendered faithfully and are skipped.
    #[cfg(target_os = "linux")]
    #[test]
    fn dir_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(OsStr::from_bytes(b"bad\xff.iso")), [0u8; 4096]).unwrap();
        fs::write(tmp.path().join("good.iso"), [0u8; 4096]).unwrap();

        let mut host = HostPlatform::new();
        host.add_volume("hd0,1", tmp.path(), None);
        let dev = host.open_device("hd0,1").unwrap();
        let seen = collect(&host.fs, dev.as_ref(), "/");

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "good.iso");
    }

    #[test]
    fn file_size_reads_metadata() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("x.img"), [0u8; 777]).unwrap();
        let mut host = HostPlatform::new();
        host.add_volume("hd1,1", tmp.path(), None);
        assert_eq!(host.file_size("hd1,1", "/x.img").unwrap(), 777);
        assert!(host.file_size("hd1,1", "/missing.img").is_err());
        assert!(host.file_size("hd9,1", "/x.img").is_err());
    }

    #[test]
    fn unknown_device_fails_to_open() {
        let host = HostPlatform::new();
        assert!(host.open_device("hd0,1").is_err());
    }

    #[test]
    fn disk_sector_zero_carries_signature() {
        let tmp = TempDir::new().unwrap();
        let mut host = HostPlatform::new();
        host.add_disk("hd0", 0xdead_beef);
        let dev = host.add_partition("hd0", tmp.path(), None);
        assert_eq!(dev, "hd0,1");

        let disk = host.open_disk("hd0").unwrap();
        let mut sig = [0u8; 4];
        disk.read(0, MBR_SIGNATURE_OFFSET, &mut sig).unwrap();
        assert_eq!(u32::from_le_bytes(sig), 0xdead_beef);

        let mut too_far = [0u8; 8];
        assert!(disk.read(0, 508, &mut too_far).is_err());

        let mut parts = Vec::new();
        disk.partitions(&mut |p| parts.push(*p)).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].number, 0);
    }

    #[test]
    fn whole_disk_opens_without_a_filesystem() {
        let tmp = TempDir::new().unwrap();
        let mut host = HostPlatform::new();
        host.add_partition("hd0", tmp.path(), None);
        let dev = host.open_device("hd0").unwrap();
        assert!(host.detect_fs(dev.as_ref()).is_none());
    }
}
