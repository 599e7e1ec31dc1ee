//! Process-wide defaults for boot image builds.
//!
//! Resolution order:
//! 1. `BOOT_IMAGE_DEFAULTS` env var (path to a TOML file, must exist)
//! 2. `$XDG_CONFIG_HOME/boot-image/defaults.toml` if present
//! 3. Built-in values
//!
//! `BOOT_IMAGE_DESCRIPTION_PATH` overrides the boot description base path
//! after the file has been applied.
//!
//! ```toml
//! [boot_image]
//! description_path = "/usr/share/kiwi/custom_boot"
//! strip_file = "strip.xml"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::description::{ImageDescription, XmlDescription};

/// Conventional base path for boot descriptions referenced by relative name.
pub const DEFAULT_BOOT_DESCRIPTION_PATH: &str = "/usr/share/kiwi/custom_boot";

/// Prefix of the boot root directory created under the target directory.
pub const BOOT_ROOT_PREFIX: &str = "boot-image.";

/// Prefix of the optional temporary boot root directory.
pub const TEMP_BOOT_ROOT_PREFIX: &str = "boot-image-temp.";

/// Env var naming a defaults TOML file.
pub const DEFAULTS_ENV: &str = "BOOT_IMAGE_DEFAULTS";

/// Env var overriding the boot description base path.
pub const DESCRIPTION_PATH_ENV: &str = "BOOT_IMAGE_DESCRIPTION_PATH";

/// Strip sections merged into every boot description.
const BUNDLED_STRIP_DESCRIPTION: &str = include_str!("../data/strip.xml");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// Base directory for relative boot description references.
    pub boot_description_path: PathBuf,
    /// Strip defaults description. `None` selects the bundled one.
    pub strip_file: Option<PathBuf>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            boot_description_path: PathBuf::from(DEFAULT_BOOT_DESCRIPTION_PATH),
            strip_file: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultsToml {
    boot_image: Option<BootImageToml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BootImageToml {
    description_path: Option<String>,
    strip_file: Option<String>,
}

impl Defaults {
    /// Load defaults from a TOML file.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading defaults '{}'", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&text, base)
            .with_context(|| format!("parsing defaults '{}'", path.display()))
    }

    /// Parse defaults from TOML text, resolving relative paths against `base`.
    pub fn parse(text: &str, base: &Path) -> Result<Self> {
        let parsed: DefaultsToml = toml::from_str(text)?;
        let mut defaults = Self::default();

        if let Some(section) = parsed.boot_image {
            if let Some(path) = section.description_path {
                defaults.boot_description_path = resolve_path(base, &path);
            }
            defaults.strip_file = section.strip_file.map(|path| resolve_path(base, &path));
        }

        Ok(defaults)
    }

    /// Resolve defaults from the environment and the user config directory.
    pub fn discover() -> Result<Self> {
        let user_file = dirs::config_dir().map(|dir| dir.join("boot-image/defaults.toml"));
        Self::discover_from(
            env::var_os(DEFAULTS_ENV).map(PathBuf::from),
            user_file,
            env::var(DESCRIPTION_PATH_ENV).ok(),
        )
    }

    fn discover_from(
        env_file: Option<PathBuf>,
        user_file: Option<PathBuf>,
        description_override: Option<String>,
    ) -> Result<Self> {
        let mut defaults = if let Some(path) = env_file {
            if !path.is_file() {
                bail!(
                    "{} points to '{}', which does not exist",
                    DEFAULTS_ENV,
                    path.display()
                );
            }
            Self::load(&path)?
        } else {
            match user_file {
                Some(path) if path.is_file() => Self::load(&path)?,
                _ => Self::default(),
            }
        };

        if let Some(path) = description_override.filter(|p| !p.trim().is_empty()) {
            defaults.boot_description_path = PathBuf::from(path);
        }

        Ok(defaults)
    }

    /// Base path for relative boot description references.
    pub fn boot_image_description_path(&self) -> &Path {
        &self.boot_description_path
    }

    /// Load the strip defaults description.
    ///
    /// Parsed on every call; nothing is cached between merges.
    pub fn load_strip_description(&self) -> Result<ImageDescription> {
        match &self.strip_file {
            Some(path) => XmlDescription::new(path).load(),
            None => XmlDescription::parse(BUNDLED_STRIP_DESCRIPTION),
        }
    }
}

fn resolve_path(base: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}
