//! vtbrowse — boot-menu browser.
//!
//! Thin binary entry point. All logic lives in the `vtbrowse-core` crate;
//! this maps host directories to boot volumes and prints the generated
//! menu script on stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use vtbrowse_core::platform::host::HOST_FS_NAME;
use vtbrowse_core::platform::{HostPlatform, ScriptExecutor};
use vtbrowse_core::{Browser, BrowserConfig, PlatformError};

#[derive(Debug, Parser)]
#[command(name = "vtbrowse")]
#[command(about = "Generate boot-menu browser scripts from host directories", long_about = None)]
struct Cli {
    /// JSON-serialised browser configuration
    #[arg(long, conflicts_with = "control")]
    config: Option<PathBuf>,

    /// Boot-manager JSON document whose `control` section configures the browser
    #[arg(long)]
    control: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List one directory of a host directory mounted as `hd0,1`
    Dir {
        /// Host directory serving as the volume root
        root: PathBuf,
        /// Path inside the volume
        #[arg(long, default_value = "/")]
        path: String,
        /// Volume label
        #[arg(long)]
        label: Option<String>,
    },
    /// List every host directory as the single partition of its own disk
    Disks {
        /// Host directories, one per disk (`hd0`, `hd1`, ...)
        roots: Vec<PathBuf>,
        /// Treat the disk at this index as the boot device and hide it
        #[arg(long)]
        boot_disk: Option<usize>,
    },
}

/// Prints every script it is handed.
struct PrintExecutor;

impl ScriptExecutor for PrintExecutor {
    fn execute(&mut self, script: &[u8]) -> Result<(), PlatformError> {
        let mut out = std::io::stdout().lock();
        out.write_all(script)
            .and_then(|()| out.flush())
            .map_err(|source| PlatformError::Io {
                path: "<stdout>".to_string(),
                source,
            })
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<BrowserConfig> {
    let mut config = match (&cli.config, &cli.control) {
        (Some(path), _) => BrowserConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        (None, Some(path)) => BrowserConfig::load_control(path)
            .with_context(|| format!("loading {}", path.display()))?,
        (None, None) => BrowserConfig::default(),
    };
    if !config.is_supported_filesystem(HOST_FS_NAME) {
        config.supported_filesystems.push(HOST_FS_NAME.to_string());
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only the menu script.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let mut platform = HostPlatform::new();

    match cli.command {
        Command::Dir { root, path, label } => {
            let device = platform.add_partition("hd0", &root, label.as_deref());
            let browser = Browser::new(platform, config);
            let token = browser
                .token_for_device(&device)
                .with_context(|| format!("mounting {}", root.display()))?;
            tracing::info!("{} mounted as {device} ({token})", root.display());
            browser
                .browse_directory(&device, &token, &path, &mut PrintExecutor)
                .with_context(|| format!("browsing {path}"))?;
        }
        Command::Disks { roots, boot_disk } => {
            for (i, root) in roots.iter().enumerate() {
                let disk = format!("hd{i}");
                let signature = 0x5654_0000 | i as u32;
                platform.add_disk(&disk, signature);
                platform.add_partition(&disk, root, None);
                if boot_disk == Some(i) {
                    platform.set_boot_signature(signature);
                }
            }
            let browser = Browser::new(platform, config);
            browser
                .browse_disks(&mut PrintExecutor)
                .context("listing disks")?;
        }
    }

    Ok(())
}
