//! Import of system description elements into a boot description.
//!
//! The merge is a fixed sequence of one-way copy steps from the system view
//! into the boot view. The steps and the enumerated field lists are static
//! tables so the contract can be inspected without running a merge.

use anyhow::Result;
use tracing::debug;

use crate::defaults::Defaults;
use crate::description::XmlState;

/// A preferences subsection copied into every boot description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferencesSubsection {
    pub name: &'static str,
    /// Element name in the description.
    pub element: &'static str,
}

pub const PREFERENCES_SUBSECTIONS: &[PreferencesSubsection] = &[
    PreferencesSubsection {
        name: "bootloader_theme",
        element: "bootloader-theme",
    },
    PreferencesSubsection {
        name: "bootsplash_theme",
        element: "bootsplash-theme",
    },
    PreferencesSubsection {
        name: "locale",
        element: "locale",
    },
    PreferencesSubsection {
        name: "packagemanager",
        element: "packagemanager",
    },
    PreferencesSubsection {
        name: "rpm_check_signatures",
        element: "rpm-check-signatures",
    },
    PreferencesSubsection {
        name: "showlicense",
        element: "showlicense",
    },
];

/// Build type attributes copied into every boot description.
pub const BUILD_TYPE_ATTRIBUTES: &[&str] = &[
    "bootkernel",
    "bootloader",
    "bootprofile",
    "boottimeout",
    "btrfs_root_is_snapshot",
    "devicepersistency",
    "filesystem",
    "firmware",
    "fsmountoptions",
    "hybrid",
    "hybridpersistent",
    "hybridpersistent_filesystem",
    "installboot",
    "installprovidefailsafe",
    "kernelcmdline",
    "ramonly",
    "vga",
    "wwid_wait_timeout",
];

/// Inputs of a merge. Only read, never written.
pub struct MergeSources<'a> {
    pub system: &'a XmlState,
    pub defaults: &'a Defaults,
}

/// One copy step of the merge.
#[derive(Clone, Copy)]
pub struct MergeStep {
    pub name: &'static str,
    pub apply: fn(&MergeSources, &mut XmlState) -> Result<()>,
}

/// Merge steps in execution order.
pub const MERGE_STEPS: &[MergeStep] = &[
    MergeStep {
        name: "displayname",
        apply: copy_displayname,
    },
    MergeStep {
        name: "name",
        apply: copy_name,
    },
    MergeStep {
        name: "repository",
        apply: copy_repositories,
    },
    MergeStep {
        name: "drivers",
        apply: copy_drivers,
    },
    MergeStep {
        name: "strip",
        apply: copy_strip,
    },
    MergeStep {
        name: "preferences",
        apply: copy_preferences,
    },
    MergeStep {
        name: "bootincluded_packages",
        apply: copy_bootincluded_packages,
    },
    MergeStep {
        name: "bootincluded_archives",
        apply: copy_bootincluded_archives,
    },
    MergeStep {
        name: "bootdelete_packages",
        apply: copy_bootdelete_packages,
    },
    MergeStep {
        name: "build_type_attributes",
        apply: copy_build_type_attributes,
    },
    MergeStep {
        name: "systemdisk",
        apply: copy_systemdisk,
    },
    MergeStep {
        name: "machine",
        apply: copy_machine,
    },
    MergeStep {
        name: "oemconfig",
        apply: copy_oemconfig,
    },
];

/// Run every [`MERGE_STEPS`] entry from `system` into `boot`.
///
/// Errors from a step are returned as-is; later steps are not run.
pub fn import_system_description_elements(
    system: &XmlState,
    boot: &mut XmlState,
    defaults: &Defaults,
) -> Result<()> {
    let sources = MergeSources { system, defaults };
    for step in MERGE_STEPS {
        debug!(step = step.name, "importing system description element");
        (step.apply)(&sources, boot)?;
    }
    Ok(())
}

fn copy_displayname(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources.system.copy_displayname(boot);
    Ok(())
}

fn copy_name(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources.system.copy_name(boot);
    Ok(())
}

fn copy_repositories(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources.system.copy_repository_sections(boot, true);
    Ok(())
}

fn copy_drivers(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources.system.copy_drivers_sections(boot);
    Ok(())
}

/// Strip sections come from the strip defaults description, loaded fresh.
fn copy_strip(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    let strip = XmlState::new(sources.defaults.load_strip_description()?, Vec::new());
    strip.copy_strip_sections(boot);
    Ok(())
}

fn copy_preferences(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    let elements: Vec<&str> = PREFERENCES_SUBSECTIONS.iter().map(|s| s.element).collect();
    sources.system.copy_preferences_subsections(&elements, boot);
    Ok(())
}

fn copy_bootincluded_packages(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources.system.copy_bootincluded_packages(boot);
    Ok(())
}

fn copy_bootincluded_archives(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources.system.copy_bootincluded_archives(boot);
    Ok(())
}

fn copy_bootdelete_packages(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources.system.copy_bootdelete_packages(boot);
    Ok(())
}

fn copy_build_type_attributes(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources
        .system
        .copy_build_type_attributes(BUILD_TYPE_ATTRIBUTES, boot);
    Ok(())
}

fn copy_systemdisk(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources.system.copy_systemdisk_section(boot);
    Ok(())
}

fn copy_machine(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources.system.copy_machine_section(boot);
    Ok(())
}

fn copy_oemconfig(sources: &MergeSources, boot: &mut XmlState) -> Result<()> {
    sources.system.copy_oemconfig_section(boot);
    Ok(())
}
