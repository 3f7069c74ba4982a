/// A single discovered menu entry.
///
/// Entries are built once by a scan session, carry their rendered menu
/// fragment verbatim, and are moved out of the [`Registry`] by the renderer.
///
/// [`Registry`]: super::Registry
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest filename stored on an entry, in bytes.
///
/// Longer names are cut at the last char boundary that fits, matching the
/// fixed-size name field the boot loader keeps per entry.
pub const MAX_FILENAME_LEN: usize = 255;

/// Directory or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    File,
}

/// Image type tag assigned to a file entry.
///
/// The declaration order is the order suffixes are tested in by the
/// classifier, except EFI which sits between VHD and IMG there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Iso,
    Wim,
    Efi,
    Img,
    Vhd,
    Vtoy,
}

impl ImageKind {
    pub const ALL: [ImageKind; 6] = [
        Self::Iso,
        Self::Wim,
        Self::Efi,
        Self::Img,
        Self::Vhd,
        Self::Vtoy,
    ];

    /// Default `--class=` value for menu entries of this type.
    pub fn default_menu_class(self) -> &'static str {
        match self {
            Self::Iso => "vtoyiso",
            Self::Wim => "vtoywim",
            Self::Efi => "vtoyefi",
            Self::Img => "vtoyimg",
            Self::Vhd => "vtoyvhd",
            Self::Vtoy => "vtoyvtoy",
        }
    }

    /// Default handler prefix; the entry calls `<prefix>_common_menuentry`.
    pub fn default_handler_prefix(self) -> &'static str {
        match self {
            Self::Iso => "iso",
            Self::Wim => "wim",
            Self::Efi => "efi",
            Self::Img => "img",
            Self::Vhd => "vhdboot",
            Self::Vtoy => "vtoyboot",
        }
    }

    /// Short upper-case tag, used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Iso => "ISO",
            Self::Wim => "WIM",
            Self::Efi => "EFI",
            Self::Img => "IMG",
            Self::Vhd => "VHD",
            Self::Vtoy => "VTOY",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One accepted directory or image file.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Name as reported by the filesystem (NOT a path).
    pub filename: CompactString,

    pub kind: EntryKind,

    /// Image type. `None` for directories.
    pub classification: Option<ImageKind>,

    /// Resolved size in bytes. Zero for directories.
    pub size: u64,

    /// Pre-built menu fragment, appended verbatim by the renderer.
    pub rendered_text: String,
}

impl Entry {
    /// Create a directory entry.
    pub fn new_dir(filename: &str, rendered_text: String) -> Self {
        Self {
            filename: bounded_name(filename),
            kind: EntryKind::Directory,
            classification: None,
            size: 0,
            rendered_text,
        }
    }

    /// Create a file entry with its image type and resolved size.
    pub fn new_file(filename: &str, kind: ImageKind, size: u64, rendered_text: String) -> Self {
        Self {
            filename: bounded_name(filename),
            kind: EntryKind::File,
            classification: Some(kind),
            size,
            rendered_text,
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Truncate `name` to at most [`MAX_FILENAME_LEN`] bytes on a char boundary.
fn bounded_name(name: &str) -> CompactString {
    if name.len() <= MAX_FILENAME_LEN {
        return CompactString::new(name);
    }
    let mut end = MAX_FILENAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    CompactString::new(&name[..end])
}
