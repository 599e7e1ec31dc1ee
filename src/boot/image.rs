//! Boot root lifecycle and the boot image strategy contract.
//!
//! [`BootImageBase`] owns everything a boot image strategy builds on:
//! the boot root directory, the initrd file name, and the boot description
//! view merged from the system description. Concrete strategies compose it
//! and implement [`BootImage`].
//!
//! Directories created by the base are removed when it is dropped (or when
//! [`BootImageBase::cleanup`] is called). A root directory handed in by the
//! caller is never removed.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::merge;
use crate::defaults::{Defaults, BOOT_ROOT_PREFIX, TEMP_BOOT_ROOT_PREFIX};
use crate::description::{XmlDescription, XmlState};
use crate::error::BootImageError;
use crate::process::{host_machine, CommandRunner, HostCommandRunner};

/// Boot image profile used when the build type sets no `bootprofile`.
pub const DEFAULT_BOOT_IMAGE_PROFILE: &str = "default";

/// Boot kernel profile used when the build type sets no `bootkernel`.
pub const DEFAULT_BOOT_KERNEL_PROFILE: &str = "std";

/// A boot image (initrd) strategy.
///
/// The default hook implementations fail with
/// [`BootImageError::NotImplemented`]; every concrete strategy overrides
/// both.
pub trait BootImage {
    fn base(&self) -> &BootImageBase;

    fn base_mut(&mut self) -> &mut BootImageBase;

    /// Populate the boot root directory.
    fn prepare(&mut self) -> Result<()> {
        Err(BootImageError::NotImplemented("prepare").into())
    }

    /// Produce the initrd at [`BootImageBase::initrd_filename`].
    fn create_initrd(&mut self) -> Result<()> {
        Err(BootImageError::NotImplemented("create_initrd").into())
    }

    /// Whether the boot root directory already has content.
    fn is_prepared(&self) -> Result<bool> {
        self.base().is_prepared()
    }
}

/// Construction options for [`BootImageBase`].
pub struct BootImageOptions {
    /// Existing boot root directory. Owned by the caller.
    pub root_dir: Option<PathBuf>,
    /// Machine architecture for the initrd name. Defaults to `uname -m`.
    pub arch: Option<String>,
    pub defaults: Defaults,
    /// Runs the removal commands of [`BootImageBase::cleanup`].
    pub runner: Box<dyn CommandRunner>,
}

impl Default for BootImageOptions {
    fn default() -> Self {
        Self {
            root_dir: None,
            arch: None,
            defaults: Defaults::default(),
            runner: Box::new(HostCommandRunner),
        }
    }
}

pub struct BootImageBase {
    xml_state: Arc<XmlState>,
    target_dir: PathBuf,
    boot_root_directory: PathBuf,
    owns_boot_root: bool,
    temp_boot_root_directory: Option<PathBuf>,
    initrd_filename: PathBuf,
    boot_xml_state: Option<XmlState>,
    defaults: Defaults,
    runner: Box<dyn CommandRunner>,
}

impl BootImageBase {
    /// Set up a boot image build for `xml_state` in `target_dir`.
    ///
    /// Without `root_dir` a fresh `boot-image.*` directory is created under
    /// `target_dir` and removed again on drop.
    pub fn new(xml_state: Arc<XmlState>, target_dir: &Path, root_dir: Option<&Path>) -> Result<Self> {
        Self::with_options(
            xml_state,
            target_dir,
            BootImageOptions {
                root_dir: root_dir.map(Path::to_path_buf),
                ..Default::default()
            },
        )
    }

    pub fn with_options(
        xml_state: Arc<XmlState>,
        target_dir: &Path,
        options: BootImageOptions,
    ) -> Result<Self> {
        if !target_dir.exists() {
            return Err(BootImageError::TargetDirectoryNotFound(target_dir.to_path_buf()).into());
        }

        let arch = options.arch.unwrap_or_else(host_machine);
        let initrd_filename = target_dir.join(format!(
            "{}.{}-{}.initrd",
            xml_state.image_name(),
            arch,
            xml_state.image_version()?
        ));

        let (boot_root_directory, owns_boot_root) = match options.root_dir {
            Some(dir) => (dir, false),
            None => (create_temp_dir(target_dir, BOOT_ROOT_PREFIX)?, true),
        };

        Ok(Self {
            xml_state,
            target_dir: target_dir.to_path_buf(),
            boot_root_directory,
            owns_boot_root,
            temp_boot_root_directory: None,
            initrd_filename,
            boot_xml_state: None,
            defaults: options.defaults,
            runner: options.runner,
        })
    }

    pub fn xml_state(&self) -> &XmlState {
        &self.xml_state
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    pub fn boot_root_directory(&self) -> &Path {
        &self.boot_root_directory
    }

    /// Whether the boot root directory was created here (and is removed on drop).
    pub fn owns_boot_root(&self) -> bool {
        self.owns_boot_root
    }

    pub fn temp_boot_root_directory(&self) -> Option<&Path> {
        self.temp_boot_root_directory.as_deref()
    }

    /// `{target_dir}/{name}.{arch}-{version}.initrd`
    pub fn initrd_filename(&self) -> &Path {
        &self.initrd_filename
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn boot_xml_state(&self) -> Option<&XmlState> {
        self.boot_xml_state.as_ref()
    }

    pub fn boot_xml_state_mut(&mut self) -> Option<&mut XmlState> {
        self.boot_xml_state.as_mut()
    }

    /// Whether the boot root directory has any entries.
    pub fn is_prepared(&self) -> Result<bool> {
        let mut entries = fs::read_dir(&self.boot_root_directory).with_context(|| {
            format!(
                "reading boot root directory '{}'",
                self.boot_root_directory.display()
            )
        })?;
        Ok(entries.next().is_some())
    }

    /// Create the temporary boot root directory under the target directory.
    ///
    /// Returns the existing one on repeated calls. It is always removed on drop.
    pub fn allocate_temp_boot_root(&mut self) -> Result<&Path> {
        let dir = match self.temp_boot_root_directory.take() {
            Some(dir) => dir,
            None => create_temp_dir(&self.target_dir, TEMP_BOOT_ROOT_PREFIX)?,
        };
        Ok(self.temp_boot_root_directory.insert(dir).as_path())
    }

    /// Directory of the boot description referenced by the system build type.
    ///
    /// Absolute references are returned unchanged, relative ones are joined
    /// to the boot description base path.
    pub fn get_boot_description_directory(&self) -> Option<PathBuf> {
        let boot = self.xml_state.build_type()?.boot()?;
        let path = Path::new(boot);
        if path.is_absolute() {
            Some(path.to_path_buf())
        } else {
            Some(self.defaults.boot_image_description_path().join(path))
        }
    }

    /// Load the boot description, replacing any previously loaded one.
    pub fn load_boot_xml_description(&mut self) -> Result<()> {
        info!("Loading Boot XML description");
        self.boot_xml_state = None;

        let boot_description_directory = self
            .get_boot_description_directory()
            .ok_or(BootImageError::NoBootDescription)?;
        let boot_config_file = boot_description_directory.join("config.xml");
        if !boot_config_file.exists() {
            return Err(BootImageError::ConfigFileNotFound(boot_description_directory).into());
        }

        let boot_description = XmlDescription::new(&boot_config_file).load()?;

        let build_type = self.xml_state.build_type();
        let boot_image_profile = build_type
            .and_then(|t| t.bootprofile())
            .unwrap_or(DEFAULT_BOOT_IMAGE_PROFILE)
            .to_string();
        let boot_kernel_profile = build_type
            .and_then(|t| t.bootkernel())
            .unwrap_or(DEFAULT_BOOT_KERNEL_PROFILE)
            .to_string();

        let boot_xml_state = XmlState::new(
            boot_description,
            vec![boot_image_profile.clone(), boot_kernel_profile.clone()],
        );

        info!("--> loaded {}", boot_config_file.display());
        if let Some(name) = boot_xml_state.build_type_name() {
            info!("--> Selected build type: {}", name);
        }
        info!(
            "--> Selected boot profiles: image: {}, kernel: {}",
            boot_image_profile, boot_kernel_profile
        );

        self.boot_xml_state = Some(boot_xml_state);
        Ok(())
    }

    /// Copy the fixed set of system description elements into the loaded
    /// boot description.
    pub fn import_system_description_elements(&mut self) -> Result<()> {
        let boot_xml_state = self
            .boot_xml_state
            .as_mut()
            .ok_or(BootImageError::BootDescriptionNotLoaded)?;
        merge::import_system_description_elements(&self.xml_state, boot_xml_state, &self.defaults)
    }

    /// Remove every directory created by this instance.
    ///
    /// Best effort: failures are logged, never returned. Safe to call
    /// repeatedly; directories already gone are skipped.
    pub fn cleanup(&self) {
        info!("Cleaning up boot image build directories");
        let owned = [
            self.owns_boot_root.then_some(&self.boot_root_directory),
            self.temp_boot_root_directory.as_ref(),
        ];
        for directory in owned.into_iter().flatten() {
            if directory.as_os_str().is_empty() || !directory.exists() {
                continue;
            }
            info!("--> removing {}", directory.display());
            let argv = vec![
                "rm".to_string(),
                "-r".to_string(),
                "-f".to_string(),
                directory.to_string_lossy().into_owned(),
            ];
            if let Err(err) = self.runner.run(&argv) {
                warn!("failed to remove {}: {:#}", directory.display(), err);
            }
        }
    }
}

impl BootImage for BootImageBase {
    fn base(&self) -> &BootImageBase {
        self
    }

    fn base_mut(&mut self) -> &mut BootImageBase {
        self
    }
}

impl Drop for BootImageBase {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn create_temp_dir(parent: &Path, prefix: &str) -> Result<PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(parent)
        .with_context(|| format!("creating {}* in '{}'", prefix, parent.display()))?;
    Ok(dir.keep())
}
