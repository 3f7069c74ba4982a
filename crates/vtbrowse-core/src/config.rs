/// Browser configuration — filters, ordering and menu identifiers.
///
/// A [`BrowserConfig`] is read-only for the lifetime of a scan. It can be
/// built from defaults, deserialised directly from JSON, or derived from the
/// boot manager's `control` section, which is an array of single-key objects
/// with string values:
///
/// ```json
/// { "control": [ { "VTOY_SORT_CASE_SENSITIVE": "1" }, { "VTOY_FILE_FLT_EFI": "1" } ] }
/// ```
///
/// In that format a `VTOY_FILE_FLT_<TYPE>` value of `"1"` hides the type.
use crate::error::ConfigError;
use crate::model::ImageKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Filesystem driver names (prefix match) that can be browsed.
pub const DEFAULT_SUPPORTED_FILESYSTEMS: [&str; 6] = ["exfat", "ntfs", "ext", "xfs", "udf", "fat"];

/// Files smaller than this are never listed.
pub const DEFAULT_MIN_FILE_SIZE: u64 = 2048;

/// Which image types are listed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFilter {
    pub iso: bool,
    pub wim: bool,
    pub efi: bool,
    pub img: bool,
    pub vhd: bool,
    pub vtoy: bool,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            iso: true,
            wim: true,
            efi: true,
            img: true,
            vhd: true,
            vtoy: true,
        }
    }
}

impl FileFilter {
    /// Whether `kind` is listed.
    pub fn allows(&self, kind: ImageKind) -> bool {
        match kind {
            ImageKind::Iso => self.iso,
            ImageKind::Wim => self.wim,
            ImageKind::Efi => self.efi,
            ImageKind::Img => self.img,
            ImageKind::Vhd => self.vhd,
            ImageKind::Vtoy => self.vtoy,
        }
    }

    fn set(&mut self, kind: ImageKind, allowed: bool) {
        match kind {
            ImageKind::Iso => self.iso = allowed,
            ImageKind::Wim => self.wim = allowed,
            ImageKind::Efi => self.efi = allowed,
            ImageKind::Img => self.img = allowed,
            ImageKind::Vhd => self.vhd = allowed,
            ImageKind::Vtoy => self.vtoy = allowed,
        }
    }
}

/// Menu identifiers for one image type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuHandler {
    /// `--class=` value of the generated menu entry.
    pub class: String,
    /// Handler prefix; the entry calls `<prefix>_common_menuentry`.
    pub prefix: String,
}

/// Per-type menu identifiers, with built-in defaults for every type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerTable {
    overrides: HashMap<ImageKind, MenuHandler>,
}

impl HandlerTable {
    /// Replace the identifiers used for `kind`.
    pub fn set(&mut self, kind: ImageKind, handler: MenuHandler) {
        self.overrides.insert(kind, handler);
    }

    pub fn menu_class(&self, kind: ImageKind) -> &str {
        self.overrides
            .get(&kind)
            .map(|h| h.class.as_str())
            .unwrap_or_else(|| kind.default_menu_class())
    }

    pub fn handler_prefix(&self, kind: ImageKind) -> &str {
        self.overrides
            .get(&kind)
            .map(|h| h.prefix.as_str())
            .unwrap_or_else(|| kind.default_handler_prefix())
    }
}

/// All knobs consulted while scanning and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Order names byte-wise instead of folding ASCII case.
    pub sort_case_sensitive: bool,
    /// Hide `._*` files (macOS resource forks).
    pub filter_dot_underscore: bool,
    pub file_filter: FileFilter,
    /// `.wim` files are listed only when WIM booting is available.
    pub wimboot_enabled: bool,
    /// `.vhd`/`.vhdx` files are listed only when VHD booting is available.
    pub vhdboot_enabled: bool,
    /// `.efi` files are listed only when the firmware can run EFI payloads.
    pub efi_payloads: bool,
    pub min_file_size: u64,
    /// Filesystem driver names (prefix match) offered by the disk listing.
    pub supported_filesystems: Vec<String>,
    pub handlers: HandlerTable,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            sort_case_sensitive: false,
            filter_dot_underscore: false,
            file_filter: FileFilter::default(),
            wimboot_enabled: false,
            vhdboot_enabled: false,
            efi_payloads: cfg!(target_os = "uefi"),
            min_file_size: DEFAULT_MIN_FILE_SIZE,
            supported_filesystems: DEFAULT_SUPPORTED_FILESYSTEMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            handlers: HandlerTable::default(),
        }
    }
}

#[derive(Deserialize)]
struct ControlDocument {
    #[serde(default)]
    control: Vec<HashMap<String, String>>,
}

impl BrowserConfig {
    /// Parse a JSON-serialised `BrowserConfig`. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON-serialised `BrowserConfig` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_file(path)?;
        Self::from_json(&text)
    }

    /// Derive a config from a boot-manager document's `control` array.
    ///
    /// Keys this engine does not consult are skipped.
    pub fn from_control_json(text: &str) -> Result<Self, ConfigError> {
        let doc: ControlDocument = serde_json::from_str(text)?;
        let mut config = Self::default();
        for item in &doc.control {
            for (key, value) in item {
                config.apply_control(key, value)?;
            }
        }
        Ok(config)
    }

    /// Read a boot-manager document and apply its `control` array.
    pub fn load_control(path: &Path) -> Result<Self, ConfigError> {
        let text = read_file(path)?;
        Self::from_control_json(&text)
    }

    /// Apply one `control` key.
    pub fn apply_control(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "VTOY_SORT_CASE_SENSITIVE" => self.sort_case_sensitive = parse_flag(key, value)?,
            "VTOY_FILT_DOT_UNDERSCORE_FILE" => self.filter_dot_underscore = parse_flag(key, value)?,
            "VTOY_WIMBOOT_ENABLE" => self.wimboot_enabled = parse_flag(key, value)?,
            "VTOY_VHDBOOT_ENABLE" => self.vhdboot_enabled = parse_flag(key, value)?,
            "VTOY_FILT_MIN_FILE_SIZE" => {
                self.min_file_size = value.trim().parse().map_err(|_| invalid(key, value))?;
            }
            _ => match key.strip_prefix("VTOY_FILE_FLT_").and_then(kind_from_tag) {
                Some(kind) => self.file_filter.set(kind, !parse_flag(key, value)?),
                None => tracing::debug!("ignoring control key {key}"),
            },
        }
        Ok(())
    }

    /// Whether the disk listing may browse a filesystem with this driver name.
    pub fn is_supported_filesystem(&self, fs_name: &str) -> bool {
        self.supported_filesystems
            .iter()
            .any(|prefix| fs_name.starts_with(prefix.as_str()))
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn kind_from_tag(tag: &str) -> Option<ImageKind> {
    ImageKind::ALL.into_iter().find(|k| k.label() == tag)
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_list_everything_but_gated_types() {
        let c = BrowserConfig::default();
        assert!(!c.sort_case_sensitive);
        assert!(ImageKind::ALL.iter().all(|&k| c.file_filter.allows(k)));
        assert!(!c.wimboot_enabled);
        assert!(!c.vhdboot_enabled);
        assert_eq!(c.min_file_size, DEFAULT_MIN_FILE_SIZE);
    }

    #[test]
    fn control_section_applies_known_keys() {
        let json = r#"{
            "control": [
                { "VTOY_DEFAULT_MENU_MODE": "1" },
                { "VTOY_SORT_CASE_SENSITIVE": "1" },
                { "VTOY_FILT_DOT_UNDERSCORE_FILE": "1" },
                { "VTOY_FILE_FLT_EFI": "1" },
                { "VTOY_FILE_FLT_ISO": "0" },
                { "VTOY_FILT_MIN_FILE_SIZE": "32768" }
            ]
        }"#;
        let c = BrowserConfig::from_control_json(json).unwrap();
        assert!(c.sort_case_sensitive);
        assert!(c.filter_dot_underscore);
        assert!(!c.file_filter.allows(ImageKind::Efi));
        assert!(c.file_filter.allows(ImageKind::Iso));
        assert_eq!(c.min_file_size, 32_768);
    }

    #[test]
    fn control_section_rejects_bad_flag() {
        let json = r#"{ "control": [ { "VTOY_SORT_CASE_SENSITIVE": "yes" } ] }"#;
        let err = BrowserConfig::from_control_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn missing_control_section_is_default() {
        let c = BrowserConfig::from_control_json("{}").unwrap();
        assert_eq!(c, BrowserConfig::default());
    }

    #[test]
    fn plain_json_fills_missing_fields() {
        let c = BrowserConfig::from_json(r#"{ "vhdboot_enabled": true }"#).unwrap();
        assert!(c.vhdboot_enabled);
        assert_eq!(c.supported_filesystems.len(), DEFAULT_SUPPORTED_FILESYSTEMS.len());
    }

    #[test]
    fn handler_overrides_fall_back_to_defaults() {
        let json = r#"{ "handlers": { "iso": { "class": "myiso", "prefix": "custom" } } }"#;
        let c = BrowserConfig::from_json(json).unwrap();
        assert_eq!(c.handlers.menu_class(ImageKind::Iso), "myiso");
        assert_eq!(c.handlers.handler_prefix(ImageKind::Iso), "custom");
        assert_eq!(c.handlers.handler_prefix(ImageKind::Wim), "wim");
    }

    #[test]
    fn supported_filesystems_match_by_prefix() {
        let c = BrowserConfig::default();
        assert!(c.is_supported_filesystem("ext2"));
        assert!(c.is_supported_filesystem("fat"));
        assert!(c.is_supported_filesystem("exfat"));
        assert!(!c.is_supported_filesystem("btrfs"));
        assert!(!c.is_supported_filesystem("iso9660"));
    }
}
