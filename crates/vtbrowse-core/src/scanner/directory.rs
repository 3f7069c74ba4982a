/// Directory scan session.
///
/// Lists one directory through its filesystem driver and turns every
/// accepted child into an [`Entry`] with its menu fragment already
/// rendered. Ordering is left to the registry and the renderer.
use super::{ScanContext, ScanStats};
use crate::classifier::{self, Verdict};
use crate::error::BrowseError;
use crate::model::{Entry, Registry};
use crate::platform::{Device, FileSystem, Platform};
use crate::render;
use tracing::debug;

/// Scan the directory `ctx` names on `device` using `fs`.
///
/// Per-child problems (a refused name, a file that will not open) only drop
/// that child. A failure of the directory iteration itself aborts the
/// session with [`BrowseError::DirectoryRead`].
pub fn scan_directory<P: Platform + ?Sized>(
    platform: &P,
    fs: &dyn FileSystem,
    device: &dyn Device,
    ctx: &ScanContext<'_>,
) -> Result<(Registry, ScanStats), BrowseError> {
    let mut registry = Registry::new(ctx.config.sort_case_sensitive);
    let mut stats = ScanStats::default();

    debug!(
        "listing {} on {} with {}",
        ctx.dir_path(),
        ctx.device,
        fs.name()
    );

    let listed = fs.dir(device, ctx.dir_path(), &mut |name, info| {
        let verdict = classifier::classify(
            name,
            info,
            ctx.config,
            |n| platform.is_valid_dir_name(n),
            || lookup_size(platform, ctx, name),
        );

        match verdict {
            Verdict::Directory => {
                stats.directories += 1;
                registry.insert(Entry::new_dir(name, render::directory_entry(ctx, name)));
            }
            Verdict::File { kind, size } => {
                stats.files += 1;
                let human = platform.human_size(size);
                let text = render::file_entry(ctx, name, kind, size, &human);
                registry.insert(Entry::new_file(name, kind, size, text));
            }
            Verdict::Rejected(reason) => {
                stats.rejected += 1;
                debug!("skip {name:?}: {reason:?}");
            }
        }
    });

    listed.map_err(|source| BrowseError::DirectoryRead {
        device: ctx.device.to_string(),
        path: ctx.dir_path().to_string(),
        source,
    })?;

    Ok((registry, stats))
}

/// Open a child to learn its size.
fn lookup_size<P: Platform + ?Sized>(
    platform: &P,
    ctx: &ScanContext<'_>,
    name: &str,
) -> Result<u64, BrowseError> {
    let path = ctx.child_path(name);
    platform.file_size(ctx.device, &path).map_err(|source| {
        let err = BrowseError::ChildOpen { path, source };
        debug!("{err}");
        err
    })
}
