//! End-to-end tests: boot description resolution, merge, and a strategy
//! built on top of the boot root lifecycle.

mod helpers;

use anyhow::Result;
use boot_image::boot::{DEFAULT_BOOT_IMAGE_PROFILE, DEFAULT_BOOT_KERNEL_PROFILE};
use boot_image::{BootImage, BootImageBase, BootImageError};
use helpers::{system_state, RecordingRunner, TestEnv};
use std::fs;
use std::path::PathBuf;

const SYSTEM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<image schemaversion="6.2" name="test-image" displayname="Test Image">
    <preferences>
        <version>1.2.3</version>
        <packagemanager>zypper</packagemanager>
        <locale>en_US</locale>
        <bootsplash-theme>openSUSE</bootsplash-theme>
        <type image="oem" boot="oemboot/suse-13.2" filesystem="ext4" ramonly="true" bootloader="grub2">
            <oemconfig>
                <oem-swap>true</oem-swap>
            </oemconfig>
        </type>
    </preferences>
    <repository type="rpm-md" alias="system-os">
        <source path="obs://openSUSE:13.2/standard"/>
    </repository>
    <packages type="image">
        <package name="kernel-default"/>
        <package name="plymouth" bootinclude="true"/>
        <package name="vim" bootdelete="true"/>
        <archive name="bootfiles.tgz" bootinclude="true"/>
    </packages>
</image>
"#;

const OEMBOOT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<image schemaversion="6.2" name="initrd-oemboot-suse-13.2">
    <profiles>
        <profile name="default" description="Booting default setup"/>
        <profile name="xen" description="Boot with xen mboot.c32 setup"/>
        <profile name="std" description="KERNEL: Default"/>
        <profile name="xenk" description="KERNEL: Xen kernel/mboot.c32"/>
    </profiles>
    <preferences>
        <version>2.1.2</version>
        <packagemanager>zypper</packagemanager>
        <type image="cpio" bootprofile="default" bootkernel="std" filesystem="ext3"/>
    </preferences>
    <repository type="rpm-md" alias="boot-stale">
        <source path="obs://stale"/>
    </repository>
    <drivers>
        <file name="drivers/md/*"/>
    </drivers>
    <packages type="image" profiles="std">
        <package name="kernel-default"/>
    </packages>
    <packages type="image" profiles="xenk">
        <package name="kernel-xen"/>
    </packages>
    <packages type="delete">
        <package name="plymouth"/>
    </packages>
</image>
"#;

/// Strategy that assembles a fixed tree and writes a marker initrd.
struct MarkerBootImage {
    base: BootImageBase,
}

impl BootImage for MarkerBootImage {
    fn base(&self) -> &BootImageBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BootImageBase {
        &mut self.base
    }

    fn prepare(&mut self) -> Result<()> {
        let root = self.base.boot_root_directory();
        fs::create_dir_all(root.join("usr/bin"))?;
        fs::write(root.join("init"), "#!/bin/sh\n")?;
        Ok(())
    }

    fn create_initrd(&mut self) -> Result<()> {
        let packages: Vec<String> = self
            .base
            .boot_xml_state()
            .map(|state| {
                state
                    .packages_sections(&["image"])
                    .flat_map(|s| s.packages.iter().map(|p| p.name.clone()))
                    .collect()
            })
            .unwrap_or_default();
        fs::write(self.base.initrd_filename(), packages.join("\n"))?;
        Ok(())
    }
}

#[test]
fn test_end_to_end_scenario() {
    let env = TestEnv::new();
    let description_dir = env.write_boot_description("oemboot/suse-13.2", OEMBOOT);
    let runner = RecordingRunner::default();

    let mut base =
        BootImageBase::with_options(system_state(SYSTEM), &env.target, env.options(&runner))
            .unwrap();

    assert_eq!(
        base.initrd_filename(),
        env.target.join("test-image.x86_64-1.2.3.initrd")
    );
    assert_eq!(base.get_boot_description_directory(), Some(description_dir));

    base.load_boot_xml_description().unwrap();
    base.import_system_description_elements().unwrap();

    let boot = base.boot_xml_state().unwrap();
    assert_eq!(boot.profiles(), &["default".to_string(), "std".to_string()]);
    assert_eq!(boot.image_name(), "test-image");
    assert_eq!(boot.displayname(), Some("Test Image"));

    let repositories: Vec<_> = boot.repository_sections().map(|r| r.source.as_str()).collect();
    assert_eq!(repositories, vec!["obs://openSUSE:13.2/standard"]);

    let build_type = boot.build_type().unwrap();
    assert_eq!(build_type.image(), Some("cpio"));
    assert_eq!(build_type.attribute("filesystem"), Some("ext4"));
    assert_eq!(build_type.attribute("ramonly"), Some("true"));
    assert_eq!(build_type.attribute("bootloader"), Some("grub2"));
    assert!(build_type.child("oemconfig").is_some());

    let image_packages: Vec<_> = boot
        .packages_sections(&["image"])
        .flat_map(|s| s.packages.iter().map(|p| p.name.as_str()))
        .collect();
    assert_eq!(image_packages, vec!["kernel-default", "plymouth"]);

    let delete_packages: Vec<_> = boot
        .packages_sections(&["delete"])
        .flat_map(|s| s.packages.iter().map(|p| p.name.as_str()))
        .collect();
    assert_eq!(delete_packages, vec!["vim"]);

    assert!(boot.strip_sections().any(|s| s.kind == "delete"));
}

#[test]
fn test_strategy_lifecycle() {
    let env = TestEnv::new();
    env.write_boot_description("oemboot/suse-13.2", OEMBOOT);

    let base = BootImageBase::with_options(
        system_state(SYSTEM),
        &env.target,
        boot_image::BootImageOptions {
            arch: Some("x86_64".to_string()),
            defaults: env.defaults(),
            ..Default::default()
        },
    )
    .unwrap();
    let mut image = MarkerBootImage { base };
    let root = image.base().boot_root_directory().to_path_buf();

    image.base_mut().load_boot_xml_description().unwrap();
    image.base_mut().import_system_description_elements().unwrap();

    assert!(!image.is_prepared().unwrap());
    image.prepare().unwrap();
    assert!(image.is_prepared().unwrap());
    image.create_initrd().unwrap();

    let initrd = image.base().initrd_filename().to_path_buf();
    assert_eq!(
        fs::read_to_string(&initrd).unwrap(),
        "kernel-default\nplymouth"
    );

    drop(image);
    assert!(!root.exists());
    assert!(initrd.exists());
}

#[test]
fn test_boot_profiles_default_when_unset() {
    let env = TestEnv::new();
    env.write_boot_description(
        "oemboot/suse-13.2",
        r#"<image name="boot"><preferences><version>1</version><type image="cpio"/></preferences></image>"#,
    );
    let runner = RecordingRunner::default();

    let mut base =
        BootImageBase::with_options(system_state(SYSTEM), &env.target, env.options(&runner))
            .unwrap();
    base.load_boot_xml_description().unwrap();

    assert_eq!(
        base.boot_xml_state().unwrap().profiles(),
        &[
            DEFAULT_BOOT_IMAGE_PROFILE.to_string(),
            DEFAULT_BOOT_KERNEL_PROFILE.to_string()
        ]
    );
}

#[test]
fn test_boot_profiles_from_build_type() {
    let env = TestEnv::new();
    env.write_boot_description("netboot/suse-13.2", OEMBOOT);
    let system = SYSTEM.replace(
        r#"boot="oemboot/suse-13.2""#,
        r#"boot="netboot/suse-13.2" bootprofile="xen" bootkernel="xenk""#,
    );
    let runner = RecordingRunner::default();

    let mut base =
        BootImageBase::with_options(system_state(&system), &env.target, env.options(&runner))
            .unwrap();
    base.load_boot_xml_description().unwrap();
    base.import_system_description_elements().unwrap();

    let boot = base.boot_xml_state().unwrap();
    assert_eq!(boot.profiles(), &["xen".to_string(), "xenk".to_string()]);
    let image_packages: Vec<_> = boot
        .packages_sections(&["image"])
        .flat_map(|s| s.packages.iter().map(|p| p.name.as_str()))
        .collect();
    assert_eq!(image_packages, vec!["kernel-xen", "plymouth"]);
}

#[test]
fn test_absolute_boot_description_reference() {
    let env = TestEnv::new();
    let dir = env.write_boot_description("custom", OEMBOOT);
    let system = SYSTEM.replace(
        "oemboot/suse-13.2",
        dir.to_str().expect("temp path is utf-8"),
    );
    let runner = RecordingRunner::default();

    let mut base =
        BootImageBase::with_options(system_state(&system), &env.target, env.options(&runner))
            .unwrap();
    assert_eq!(base.get_boot_description_directory(), Some(dir));
    base.load_boot_xml_description().unwrap();
    assert!(base.boot_xml_state().is_some());
}

#[test]
fn test_missing_boot_config_file() {
    let env = TestEnv::new();
    let runner = RecordingRunner::default();

    let mut base =
        BootImageBase::with_options(system_state(SYSTEM), &env.target, env.options(&runner))
            .unwrap();
    let err = base.load_boot_xml_description().unwrap_err();

    let expected: PathBuf = env.boot_descriptions.join("oemboot/suse-13.2");
    assert!(matches!(
        err.downcast_ref::<BootImageError>(),
        Some(BootImageError::ConfigFileNotFound(dir)) if dir == &expected
    ));
    assert!(base.boot_xml_state().is_none());
}

#[test]
fn test_failed_reload_clears_previous_boot_description() {
    let env = TestEnv::new();
    let dir = env.write_boot_description("oemboot/suse-13.2", OEMBOOT);
    let runner = RecordingRunner::default();

    let mut base =
        BootImageBase::with_options(system_state(SYSTEM), &env.target, env.options(&runner))
            .unwrap();
    base.load_boot_xml_description().unwrap();
    assert!(base.boot_xml_state().is_some());

    fs::remove_file(dir.join("config.xml")).unwrap();
    assert!(base.load_boot_xml_description().is_err());
    assert!(base.boot_xml_state().is_none());
}

#[test]
fn test_reload_replaces_boot_description() {
    let env = TestEnv::new();
    env.write_boot_description("oemboot/suse-13.2", OEMBOOT);
    let runner = RecordingRunner::default();

    let mut base =
        BootImageBase::with_options(system_state(SYSTEM), &env.target, env.options(&runner))
            .unwrap();
    base.load_boot_xml_description().unwrap();
    base.import_system_description_elements().unwrap();
    assert_eq!(base.boot_xml_state().unwrap().image_name(), "test-image");

    base.load_boot_xml_description().unwrap();
    assert_eq!(
        base.boot_xml_state().unwrap().image_name(),
        "initrd-oemboot-suse-13.2"
    );
}

#[test]
fn test_no_boot_description_reference() {
    let env = TestEnv::new();
    let system = SYSTEM.replace(r#" boot="oemboot/suse-13.2""#, "");
    let runner = RecordingRunner::default();

    let mut base =
        BootImageBase::with_options(system_state(&system), &env.target, env.options(&runner))
            .unwrap();
    assert_eq!(base.get_boot_description_directory(), None);
    let err = base.load_boot_xml_description().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BootImageError>(),
        Some(BootImageError::NoBootDescription)
    ));
}

#[test]
fn test_teardown_twice_issues_single_removal() {
    let env = TestEnv::new();
    let runner = RecordingRunner::default();

    let base =
        BootImageBase::with_options(system_state(SYSTEM), &env.target, env.options(&runner))
            .unwrap();
    let root = base.boot_root_directory().to_path_buf();

    base.cleanup();
    assert_eq!(runner.calls.borrow().len(), 1);

    // The recording runner leaves the directory behind; remove it by hand.
    fs::remove_dir_all(&root).unwrap();
    base.cleanup();
    drop(base);
    assert_eq!(runner.calls.borrow().len(), 1);
}
