/// Scanner module — the two scan sessions behind the browser commands.
///
/// - **Directory session** ([`directory::scan_directory`]): lists one
///   directory of one filesystem, classifies every child and collects the
///   accepted ones, each with its menu fragment, in a [`Registry`].
/// - **Disk session** ([`disk::scan_disks`]): walks the attached hard disks
///   and writes one entry per partition straight into the menu buffer.
///
/// Both sessions take their state explicitly through a [`ScanContext`] or
/// their arguments; nothing is kept between invocations except the
/// filesystem handle table owned by the [`Browser`](crate::browser::Browser).
///
/// [`Registry`]: crate::model::Registry
pub mod directory;
pub mod disk;

use crate::config::BrowserConfig;
use crate::platform::FsHandle;

/// Read-only state of one directory scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    /// Device identifier as given to the command, e.g. `hd0,1`.
    pub device: &'a str,
    /// Handle of the filesystem driver the directory is read with.
    pub fs_handle: FsHandle,
    /// Path prefix children are joined to. Empty for the root.
    pub path: &'a str,
    pub config: &'a BrowserConfig,
}

impl<'a> ScanContext<'a> {
    pub fn new(
        device: &'a str,
        fs_handle: FsHandle,
        path: &'a str,
        config: &'a BrowserConfig,
    ) -> Self {
        Self {
            device,
            fs_handle,
            path: path_prefix(path),
            config,
        }
    }

    /// Path handed to the filesystem's directory iteration.
    pub fn dir_path(&self) -> &str {
        if self.path.is_empty() {
            "/"
        } else {
            self.path
        }
    }

    /// `<path>/<name>` of a child.
    pub fn child_path(&self, name: &str) -> String {
        format!("{}/{}", self.path, name)
    }
}

/// The root `/` becomes the empty prefix so joined children read `/name`
/// rather than `//name`. Any other path is kept verbatim.
pub fn path_prefix(path: &str) -> &str {
    if path == "/" {
        ""
    } else {
        path
    }
}

/// Counters reported at the end of a directory session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub directories: usize,
    pub files: usize,
    pub rejected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_normalised_to_empty_prefix() {
        let config = BrowserConfig::default();
        let ctx = ScanContext::new("hd0,1", FsHandle::new(1), "/", &config);
        assert_eq!(ctx.path, "");
        assert_eq!(ctx.dir_path(), "/");
        assert_eq!(ctx.child_path("a.iso"), "/a.iso");
    }

    #[test]
    fn nested_path_is_kept() {
        let config = BrowserConfig::default();
        let ctx = ScanContext::new("hd0,1", FsHandle::new(1), "/ISO/Linux", &config);
        assert_eq!(ctx.dir_path(), "/ISO/Linux");
        assert_eq!(ctx.child_path("a.iso"), "/ISO/Linux/a.iso");
    }
}
