/// Menu renderer — builds the menu-script fragments and hands the finished
/// script to the interpreter.
///
/// Every fragment is a complete `menuentry ... { ... }` block ending in a
/// newline. Titles pad their leading label (`DIR`, `<--`, a size) to ten
/// columns so names line up in the menu.
use crate::error::BrowseError;
use crate::menu_write;
use crate::model::{EntryKind, ImageKind, MenuBuffer, Registry};
use crate::platform::{PartitionScheme, ScriptExecutor};
use crate::scanner::ScanContext;
use tracing::debug;

/// Command a directory or partition entry re-invokes.
pub const BROWSE_DIR_COMMAND: &str = "vt_browser_dir";

const LABEL_WIDTH: usize = 10;
const DIR_LABEL: &str = "DIR";
const DISK_LABEL: &str = "DISK";
const BACK_LABEL: &str = "<--";

/// Where the back entry leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackTarget {
    /// `[../]` at the top of a directory listing.
    ParentDirectory,
    /// `[Return]` at the top of the disk listing.
    Return,
}

impl BackTarget {
    fn caption(self) -> &'static str {
        match self {
            Self::ParentDirectory => "[../]",
            Self::Return => "[Return]",
        }
    }
}

/// Append the back entry, always the first entry of a menu.
pub fn back_entry(buf: &mut MenuBuffer, target: BackTarget) -> Result<(), BrowseError> {
    menu_write!(
        buf,
        "menuentry \"{:<w$} {}\" --class=\"vtoyret\" VTOY_RET {{\n    echo 'return ...' \n}}\n",
        BACK_LABEL,
        target.caption(),
        w = LABEL_WIDTH
    )
}

/// Fragment for a subdirectory: re-enters the browser one level down.
pub fn directory_entry(ctx: &ScanContext<'_>, name: &str) -> String {
    format!(
        "menuentry \"{:<w$} [{name}]\" --class=vtoydir {{\n  {BROWSE_DIR_COMMAND} {} {} \"{}\"\n}}\n",
        DIR_LABEL,
        ctx.device,
        ctx.fs_handle,
        ctx.child_path(name),
        w = LABEL_WIDTH
    )
}

/// Fragment for a bootable image: hands the file to its type's handler.
pub fn file_entry(
    ctx: &ScanContext<'_>,
    name: &str,
    kind: ImageKind,
    size: u64,
    human_size: &str,
) -> String {
    let class = ctx.config.handlers.menu_class(kind);
    let prefix = ctx.config.handlers.handler_prefix(kind);
    format!(
        "menuentry \"{human_size:<w$} {name}\" --class={class} {{\n  \
         vt_set_fake_vlnk \"({}){}\" {prefix} {size}\n  \
         {prefix}_common_menuentry\n  \
         vt_reset_fake_vlnk\n}}\n",
        ctx.device,
        ctx.child_path(name),
        w = LABEL_WIDTH
    )
}

/// Title of a partition entry in the disk listing.
pub fn partition_title(
    disk: &str,
    scheme: PartitionScheme,
    part_no: u32,
    label: &str,
    fs_name: &str,
    human_size: &str,
) -> String {
    format!(
        "{DISK_LABEL:<w$} ({disk},{}{part_no}) [{label}] {fs_name} {human_size}",
        scheme.tag(),
        w = LABEL_WIDTH
    )
}

/// Append a partition whose filesystem can be browsed.
pub fn partition_entry(
    buf: &mut MenuBuffer,
    title: &str,
    device: &str,
    token: &str,
) -> Result<(), BrowseError> {
    menu_write!(
        buf,
        "menuentry \"{title}\" --class=vtoydisk {{\n  {BROWSE_DIR_COMMAND} {device} {token} /\n}}\n"
    )
}

/// Append a partition whose filesystem is recognised but not browsable.
pub fn unsupported_partition_entry(buf: &mut MenuBuffer, title: &str) -> Result<(), BrowseError> {
    menu_write!(
        buf,
        "menuentry \"{title}\" --class=vtoydisk {{\n   echo \"unsupported file system type!\" \n   ventoy_pause\n}}\n"
    )
}

/// Write a directory listing: the back entry, then every directory, then
/// every file, each group in name order. Leaves `registry` empty.
pub fn render_directory(registry: &mut Registry, buf: &mut MenuBuffer) -> Result<(), BrowseError> {
    back_entry(buf, BackTarget::ParentDirectory)?;
    for kind in [EntryKind::Directory, EntryKind::File] {
        for entry in registry.drain_sorted(kind) {
            debug!("emit {:?} {}", kind, entry.filename);
            buf.append_bytes(entry.rendered_text.as_bytes())?;
        }
    }
    Ok(())
}

/// Run the finished script, then release the buffer.
pub fn submit(buf: MenuBuffer, executor: &mut dyn ScriptExecutor) -> Result<(), BrowseError> {
    debug!("submitting {} byte menu script", buf.len());
    let result = executor.execute(buf.as_bytes()).map_err(BrowseError::Script);
    buf.release();
    result
}
