/// Disk scan session.
///
/// Walks every attached hard disk except the one the boot manager itself
/// lives on and writes one menu entry per partition with a recognisable
/// filesystem. Partition entries are written in enumeration order, straight
/// into the menu buffer.
use crate::config::BrowserConfig;
use crate::error::BrowseError;
use crate::model::MenuBuffer;
use crate::platform::{Disk, HandleTable, PartitionInfo, Platform};
use crate::render;
use tracing::debug;

/// Only disks whose name starts with this are listed.
pub const HARD_DISK_PREFIX: &str = "hd";

/// Byte offset of the 32-bit disk signature inside the MBR.
pub const MBR_SIGNATURE_OFFSET: usize = 0x1b8;

/// Counters reported at the end of a disk session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiskStats {
    pub disks: usize,
    pub partitions: usize,
    pub unsupported: usize,
}

/// Append a partition entry for every usable partition of every listed
/// disk. Filesystems of supported partitions are registered in `handles`
/// so their entries can carry a continuation token.
pub fn scan_disks<P: Platform + ?Sized>(
    platform: &P,
    handles: &HandleTable,
    config: &BrowserConfig,
    buf: &mut MenuBuffer,
) -> Result<DiskStats, BrowseError> {
    let mut names = Vec::new();
    platform.disks(&mut |name| names.push(name.to_string()));

    let own_signature = platform.boot_signature();
    let mut stats = DiskStats::default();

    for name in names {
        if !name.starts_with(HARD_DISK_PREFIX) {
            debug!("skip disk {name}: not a hard disk");
            continue;
        }
        let disk = match platform.open_disk(&name) {
            Ok(disk) => disk,
            Err(e) => {
                debug!("skip disk {name}: {e}");
                continue;
            }
        };
        if own_signature.is_some() && read_signature(disk.as_ref()) == own_signature {
            debug!("skip disk {name}: boot device");
            continue;
        }

        let mut parts = Vec::new();
        if let Err(e) = disk.partitions(&mut |part| parts.push(*part)) {
            debug!("skip disk {name}: {e}");
            continue;
        }

        stats.disks += 1;
        for part in &parts {
            scan_partition(platform, handles, config, disk.as_ref(), part, buf, &mut stats)?;
        }
    }

    Ok(stats)
}

/// The disk's MBR signature, or `None` if sector 0 cannot be read.
fn read_signature(disk: &dyn Disk) -> Option<u32> {
    let mut raw = [0u8; 4];
    match disk.read(0, MBR_SIGNATURE_OFFSET, &mut raw) {
        Ok(()) => Some(u32::from_le_bytes(raw)),
        Err(e) => {
            debug!("cannot read signature of {}: {e}", disk.name());
            None
        }
    }
}

fn scan_partition<P: Platform + ?Sized>(
    platform: &P,
    handles: &HandleTable,
    config: &BrowserConfig,
    disk: &dyn Disk,
    part: &PartitionInfo,
    buf: &mut MenuBuffer,
    stats: &mut DiskStats,
) -> Result<(), BrowseError> {
    let part_no = part.number + 1;
    let device_name = format!("{},{part_no}", disk.name());

    let device = match platform.open_device(&device_name) {
        Ok(device) => device,
        Err(e) => {
            debug!("skip {device_name}: {e}");
            return Ok(());
        }
    };
    let Some(fs) = platform.detect_fs(device.as_ref()) else {
        debug!("skip {device_name}: no filesystem");
        return Ok(());
    };
    let label = fs.label(device.as_ref()).unwrap_or_default();
    drop(device);

    let bytes = part.len_sectors << disk.log_sector_size();
    let title = render::partition_title(
        disk.name(),
        part.scheme,
        part_no,
        &label,
        fs.name(),
        &platform.human_size(bytes),
    );

    stats.partitions += 1;
    if config.is_supported_filesystem(fs.name()) {
        let token = handles.register(fs).to_token();
        debug!("{device_name}: browsable as {token}");
        render::partition_entry(buf, &title, &device_name, &token)
    } else {
        stats.unsupported += 1;
        debug!("{device_name}: unsupported filesystem {}", fs.name());
        render::unsupported_partition_entry(buf, &title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::platform::{
        Device, DeviceProvider, DirEntryInfo, DiskProvider, FileSystem, PartitionScheme,
    };
    use std::sync::Arc;

    struct NamedFs(&'static str);

    impl FileSystem for NamedFs {
        fn name(&self) -> &str {
            self.0
        }
        fn dir(
            &self,
            _: &dyn Device,
            _: &str,
            _: &mut dyn FnMut(&str, &DirEntryInfo),
        ) -> Result<(), PlatformError> {
            Ok(())
        }
        fn label(&self, _: &dyn Device) -> Option<String> {
            Some(format!("{}-vol", self.0))
        }
    }

    struct Dev(String);

    impl Device for Dev {
        fn name(&self) -> &str {
            &self.0
        }
    }

    #[derive(Clone)]
    struct MockDisk {
        name: &'static str,
        signature: u32,
        /// (mbr type, sectors, filesystem) per partition; `None` = unrecognised.
        parts: Vec<(u8, u64, Option<&'static str>)>,
    }

    impl Disk for MockDisk {
        fn name(&self) -> &str {
            self.name
        }
        fn log_sector_size(&self) -> u32 {
            9
        }
        fn read(&self, sector: u64, offset: usize, buf: &mut [u8]) -> Result<(), PlatformError> {
            assert_eq!((sector, offset, buf.len()), (0, MBR_SIGNATURE_OFFSET, 4));
            buf.copy_from_slice(&self.signature.to_le_bytes());
            Ok(())
        }
        fn partitions(&self, visitor: &mut dyn FnMut(&PartitionInfo)) -> Result<(), PlatformError> {
            for (i, (ty, len, _)) in self.parts.iter().enumerate() {
                visitor(&PartitionInfo {
                    number: i as u32,
                    scheme: PartitionScheme::from_mbr_type(*ty),
                    len_sectors: *len,
                });
            }
            Ok(())
        }
    }

    struct Machine {
        disks: Vec<MockDisk>,
        own: Option<u32>,
    }

    impl Machine {
        fn fs_for(&self, device: &str) -> Option<&'static str> {
            let (disk, part) = device.split_once(',')?;
            let idx: usize = part.parse().ok()?;
            let disk = self.disks.iter().find(|d| d.name == disk)?;
            disk.parts.get(idx - 1)?.2
        }
    }

    impl DeviceProvider for Machine {
        fn open_device(&self, name: &str) -> Result<Box<dyn Device>, PlatformError> {
            Ok(Box::new(Dev(name.to_string())))
        }
        fn detect_fs(&self, device: &dyn Device) -> Option<Arc<dyn FileSystem>> {
            self.fs_for(device.name())
                .map(|n| Arc::new(NamedFs(n)) as Arc<dyn FileSystem>)
        }
        fn file_size(&self, _: &str, path: &str) -> Result<u64, PlatformError> {
            Err(PlatformError::NotFound(path.to_string()))
        }
    }

    impl DiskProvider for Machine {
        fn disks(&self, visitor: &mut dyn FnMut(&str)) {
            visitor("fd0");
            for d in &self.disks {
                visitor(d.name);
            }
        }
        fn open_disk(&self, name: &str) -> Result<Box<dyn Disk>, PlatformError> {
            self.disks
                .iter()
                .find(|d| d.name == name)
                .cloned()
                .map(|d| Box::new(d) as Box<dyn Disk>)
                .ok_or_else(|| PlatformError::NotFound(name.to_string()))
        }
        fn boot_signature(&self) -> Option<u32> {
            self.own
        }
    }

    impl Platform for Machine {}

    fn scan(machine: &Machine) -> (String, DiskStats, HandleTable) {
        let handles = HandleTable::new();
        let mut buf = MenuBuffer::with_default_capacity().unwrap();
        let stats = scan_disks(machine, &handles, &BrowserConfig::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf.as_bytes().to_vec()).unwrap();
        (text, stats, handles)
    }

    #[test]
    fn boot_disk_is_excluded() {
        let machine = Machine {
            disks: vec![
                MockDisk {
                    name: "hd0",
                    signature: 0xAABB_CCDD,
                    parts: vec![(0x07, 2048, Some("exfat"))],
                },
                MockDisk {
                    name: "hd1",
                    signature: 0x1122_3344,
                    parts: vec![(0xee, 8_388_608, Some("ntfs"))],
                },
            ],
            own: Some(0xAABB_CCDD),
        };
        let (text, stats, handles) = scan(&machine);
        assert!(!text.contains("(hd0,"));
        assert!(text.contains(
            "menuentry \"DISK       (hd1,gpt1) [ntfs-vol] ntfs 4.00G\" --class=vtoydisk {\n  \
             vt_browser_dir hd1,1 0x01000001 /\n}\n"
        ));
        assert_eq!(stats.disks, 1);
        assert_eq!(handles.len(), 1);
    }

    #[test]
    fn unsupported_and_unrecognised_partitions() {
        let machine = Machine {
            disks: vec![MockDisk {
                name: "hd0",
                signature: 1,
                parts: vec![
                    (0x83, 2048, Some("btrfs")),
                    (0x07, 2048, None),
                    (0x83, 2048, Some("ext2")),
                ],
            }],
            own: None,
        };
        let (text, stats, _) = scan(&machine);
        assert_eq!(
            stats,
            DiskStats {
                disks: 1,
                partitions: 2,
                unsupported: 1
            }
        );
        let btrfs = text.find("(hd0,msdos1)").unwrap();
        let ext = text.find("(hd0,msdos3)").unwrap();
        assert!(btrfs < ext, "enumeration order kept");
        assert!(!text.contains("msdos2"));
        assert!(text.contains("echo \"unsupported file system type!\""));
        assert!(text.contains("vt_browser_dir hd0,3 0x01000001 /"));
    }

    #[test]
    fn non_hard_disks_are_ignored() {
        let machine = Machine {
            disks: Vec::new(),
            own: None,
        };
        let (text, stats, _) = scan(&machine);
        assert!(text.is_empty());
        assert_eq!(stats, DiskStats::default());
    }

    /// A shared driver keeps one handle across partitions and disks.
    #[test]
    fn same_driver_shares_a_token() {
        let machine = Machine {
            disks: vec![
                MockDisk {
                    name: "hd0",
                    signature: 1,
                    parts: vec![(0x07, 2048, Some("ntfs")), (0x07, 2048, Some("ntfs"))],
                },
                MockDisk {
                    name: "hd1",
                    signature: 2,
                    parts: vec![(0x0c, 2048, Some("fat"))],
                },
            ],
            own: None,
        };
        let (text, _, handles) = scan(&machine);
        assert!(text.contains("vt_browser_dir hd0,1 0x01000001 /"));
        assert!(text.contains("vt_browser_dir hd0,2 0x01000001 /"));
        assert!(text.contains("vt_browser_dir hd1,1 0x01000002 /"));
        assert_eq!(handles.len(), 2);
    }
}
