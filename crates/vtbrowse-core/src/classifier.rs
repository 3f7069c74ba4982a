/// Entry classification — decides which children of a directory appear in
/// the menu and what image type each file is.
///
/// Classification is name-based and cheap because it runs once per child of
/// a potentially large directory. Opening a file to learn its size is the
/// last resort, taken only for files that already passed every name rule
/// and whose size the directory listing did not report.
use crate::config::BrowserConfig;
use crate::model::ImageKind;
use crate::platform::DirEntryInfo;

/// Minimum byte length of a file name that can carry an image suffix.
const MIN_FILE_NAME_LEN: usize = 4;

/// Helper images the boot manager keeps next to user images. They end in
/// `.img` but are never offered as boot targets.
const RESERVED_IMG_PREFIX: &str = "ventoy_";
const RESERVED_IMG_STEMS: [&str; 2] = ["wimboot", "vhdboot"];
const RESERVED_IMG_LEN: usize = 18;

/// Why a child was left out of the menu. Only used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// `.` or `..`.
    DotEntry,
    /// The name validator refused the directory name.
    InvalidName,
    /// `$RECYCLE.BIN`, `$Extend` and the like.
    SystemDirectory,
    /// File name too short to carry a suffix.
    NameTooShort,
    /// No enabled image suffix matched.
    UnsupportedSuffix,
    /// One of the boot manager's own helper images.
    ReservedImage,
    /// A `._` resource-fork file while dot-underscore filtering is on.
    DotUnderscore,
    /// The size could not be determined because the file did not open.
    OpenFailed,
    /// Smaller than the configured minimum.
    TooSmall,
}

/// Outcome of classifying one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Rejected(RejectReason),
    Directory,
    File { kind: ImageKind, size: u64 },
}

/// Classify one child reported by a directory listing.
///
/// `is_valid_dir_name` is the external name validator; `size_lookup` opens
/// the file and returns its size, and is called at most once, only for a
/// file whose listed size is zero or unknown.
pub fn classify<E>(
    name: &str,
    info: &DirEntryInfo,
    config: &BrowserConfig,
    is_valid_dir_name: impl FnOnce(&str) -> bool,
    size_lookup: impl FnOnce() -> Result<u64, E>,
) -> Verdict {
    if info.is_dir {
        return match classify_dir_name(name, is_valid_dir_name) {
            Ok(()) => Verdict::Directory,
            Err(reason) => Verdict::Rejected(reason),
        };
    }

    let kind = match classify_file_name(name, config) {
        Ok(kind) => kind,
        Err(reason) => return Verdict::Rejected(reason),
    };

    let size = match info.size {
        Some(size) if size > 0 => size,
        _ => match size_lookup() {
            Ok(size) => size,
            Err(_) => return Verdict::Rejected(RejectReason::OpenFailed),
        },
    };

    if size < config.min_file_size {
        return Verdict::Rejected(RejectReason::TooSmall);
    }

    Verdict::File { kind, size }
}

/// Name rules for directories.
pub fn classify_dir_name(
    name: &str,
    is_valid_dir_name: impl FnOnce(&str) -> bool,
) -> Result<(), RejectReason> {
    if name == "." || name == ".." {
        return Err(RejectReason::DotEntry);
    }
    if !is_valid_dir_name(name) {
        return Err(RejectReason::InvalidName);
    }
    if name.starts_with('$') && (name.starts_with("$RECYCLE.BIN") || starts_with_ci(name, "$Extend"))
    {
        return Err(RejectReason::SystemDirectory);
    }
    Ok(())
}

/// Name rules for files: suffix match against the enabled types, reserved
/// helper images, then the dot-underscore filter.
pub fn classify_file_name(name: &str, config: &BrowserConfig) -> Result<ImageKind, RejectReason> {
    let len = name.len();
    if len < MIN_FILE_NAME_LEN {
        return Err(RejectReason::NameTooShort);
    }

    let filter = &config.file_filter;
    let kind = if filter.iso && ends_with_ci(name, ".iso") {
        ImageKind::Iso
    } else if filter.wim && config.wimboot_enabled && ends_with_ci(name, ".wim") {
        ImageKind::Wim
    } else if filter.vhd
        && config.vhdboot_enabled
        && (ends_with_ci(name, ".vhd") || ends_with_ci(name, ".vhdx"))
    {
        ImageKind::Vhd
    } else if filter.efi && config.efi_payloads && ends_with_ci(name, ".efi") {
        ImageKind::Efi
    } else if filter.img && ends_with_ci(name, ".img") {
        if is_reserved_image(name) {
            return Err(RejectReason::ReservedImage);
        }
        ImageKind::Img
    } else if filter.vtoy && ends_with_ci(name, ".vtoy") {
        ImageKind::Vtoy
    } else {
        return Err(RejectReason::UnsupportedSuffix);
    };

    if config.filter_dot_underscore && name.starts_with("._") {
        return Err(RejectReason::DotUnderscore);
    }

    Ok(kind)
}

/// `ventoy_wimboot.img` / `ventoy_vhdboot.img`; the stem is case-sensitive.
fn is_reserved_image(name: &str) -> bool {
    name.len() == RESERVED_IMG_LEN
        && name
            .strip_prefix(RESERVED_IMG_PREFIX)
            .is_some_and(|rest| RESERVED_IMG_STEMS.iter().any(|stem| rest.starts_with(stem)))
}

/// ASCII case-insensitive suffix test on bytes (safe on any UTF-8 name).
fn ends_with_ci(name: &str, suffix: &str) -> bool {
    let (n, s) = (name.as_bytes(), suffix.as_bytes());
    n.len() >= s.len() && n[n.len() - s.len()..].eq_ignore_ascii_case(s)
}

fn starts_with_ci(name: &str, prefix: &str) -> bool {
    let (n, p) = (name.as_bytes(), prefix.as_bytes());
    n.len() >= p.len() && n[..p.len()].eq_ignore_ascii_case(p)
}
