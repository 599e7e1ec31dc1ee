//! Profile-scoped view of an image description.
//!
//! The `copy_*` operations move data one way, from `self` into a target
//! view. All of them are idempotent.

use anyhow::Result;

use super::model::{
    Archive, Drivers, ImageDescription, Package, Packages, Preferences, Profiled, Repository,
    Strip, TypeSection,
};
use crate::error::DescriptionError;

#[derive(Debug, Clone)]
pub struct XmlState {
    xml_data: ImageDescription,
    profiles: Vec<String>,
}

impl XmlState {
    /// Scope `xml_data` to `profiles`.
    ///
    /// With no profiles requested, the profiles declared with `import="true"`
    /// are selected.
    pub fn new(xml_data: ImageDescription, profiles: Vec<String>) -> Self {
        let profiles = if profiles.is_empty() {
            xml_data
                .profiles
                .iter()
                .filter(|p| p.import)
                .map(|p| p.name.clone())
                .collect()
        } else {
            profiles
        };
        Self { xml_data, profiles }
    }

    pub fn xml_data(&self) -> &ImageDescription {
        &self.xml_data
    }

    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    pub fn image_name(&self) -> &str {
        &self.xml_data.name
    }

    pub fn displayname(&self) -> Option<&str> {
        self.xml_data.displayname.as_deref()
    }

    fn active<'a, T: Profiled + 'a>(
        &'a self,
        sections: &'a [T],
    ) -> impl Iterator<Item = &'a T> + 'a {
        sections.iter().filter(|s| s.is_active(&self.profiles))
    }

    fn active_index<T: Profiled>(
        &self,
        sections: &[T],
        pred: impl Fn(&T) -> bool,
    ) -> Option<usize> {
        sections
            .iter()
            .position(|s| s.is_active(&self.profiles) && pred(s))
    }

    pub fn preferences_sections(&self) -> impl Iterator<Item = &Preferences> {
        self.active(&self.xml_data.preferences)
    }

    pub fn repository_sections(&self) -> impl Iterator<Item = &Repository> {
        self.active(&self.xml_data.repositories)
    }

    pub fn drivers_sections(&self) -> impl Iterator<Item = &Drivers> {
        self.active(&self.xml_data.drivers)
    }

    pub fn strip_sections(&self) -> impl Iterator<Item = &Strip> {
        self.active(&self.xml_data.strip)
    }

    /// Active packages sections whose type is one of `kinds`.
    pub fn packages_sections<'a>(
        &'a self,
        kinds: &'a [&'a str],
    ) -> impl Iterator<Item = &'a Packages> {
        self.active(&self.xml_data.packages)
            .filter(move |p| kinds.contains(&p.kind.as_str()))
    }

    /// Image version from the first active preferences declaring one.
    pub fn image_version(&self) -> Result<&str> {
        self.preferences_sections()
            .find_map(Preferences::version)
            .ok_or_else(|| DescriptionError::MissingImageVersion.into())
    }

    /// (preferences, type) index of the selected build type: the primary
    /// type of the active preferences, otherwise the first type.
    fn build_type_location(&self) -> Option<(usize, usize)> {
        let mut first = None;
        for (i, preferences) in self.xml_data.preferences.iter().enumerate() {
            if !preferences.is_active(&self.profiles) {
                continue;
            }
            for (j, build_type) in preferences.types.iter().enumerate() {
                if build_type.is_primary() {
                    return Some((i, j));
                }
                first.get_or_insert((i, j));
            }
        }
        first
    }

    pub fn build_type(&self) -> Option<&TypeSection> {
        let (i, j) = self.build_type_location()?;
        Some(&self.xml_data.preferences[i].types[j])
    }

    fn build_type_mut(&mut self) -> Option<&mut TypeSection> {
        let (i, j) = self.build_type_location()?;
        Some(&mut self.xml_data.preferences[i].types[j])
    }

    pub fn build_type_name(&self) -> Option<&str> {
        self.build_type().and_then(TypeSection::image)
    }

    fn source_packages_kinds(&self) -> Vec<&str> {
        let mut kinds = vec!["image", "bootstrap"];
        if let Some(name) = self.build_type_name() {
            kinds.push(name);
        }
        kinds
    }

    /// First active packages section of `kind`, created when missing.
    fn packages_section_mut(&mut self, kind: &str) -> &mut Packages {
        let index = match self.active_index(&self.xml_data.packages, |p| p.kind == kind) {
            Some(index) => index,
            None => {
                self.xml_data.packages.push(Packages::of_kind(kind));
                self.xml_data.packages.len() - 1
            }
        };
        &mut self.xml_data.packages[index]
    }

    /// First active preferences section, created when missing.
    fn preferences_section_mut(&mut self) -> &mut Preferences {
        let index = match self.active_index(&self.xml_data.preferences, |_| true) {
            Some(index) => index,
            None => {
                self.xml_data.preferences.push(Preferences::default());
                self.xml_data.preferences.len() - 1
            }
        };
        &mut self.xml_data.preferences[index]
    }

    // ─────────────────────────────────────────────────────────────────────
    // Copy operations
    // ─────────────────────────────────────────────────────────────────────

    pub fn copy_displayname(&self, target: &mut XmlState) {
        if let Some(displayname) = self.displayname() {
            target.xml_data.displayname = Some(displayname.to_string());
        }
    }

    pub fn copy_name(&self, target: &mut XmlState) {
        target.xml_data.name = self.xml_data.name.clone();
    }

    /// Copy active repositories. With `wipe`, the target's repositories are
    /// replaced by exactly this set.
    pub fn copy_repository_sections(&self, target: &mut XmlState, wipe: bool) {
        let repositories: Vec<Repository> = self.repository_sections().map(unscoped).collect();
        if wipe {
            target.xml_data.repositories = repositories;
        } else {
            for repository in repositories {
                if !target.xml_data.repositories.contains(&repository) {
                    target.xml_data.repositories.push(repository);
                }
            }
        }
    }

    pub fn copy_drivers_sections(&self, target: &mut XmlState) {
        for drivers in self.drivers_sections().map(unscoped) {
            if !target.xml_data.drivers.contains(&drivers) {
                target.xml_data.drivers.push(drivers);
            }
        }
    }

    pub fn copy_strip_sections(&self, target: &mut XmlState) {
        for strip in self.strip_sections().map(unscoped) {
            if !target.xml_data.strip.contains(&strip) {
                target.xml_data.strip.push(strip);
            }
        }
    }

    /// Copy the named preferences subsections (XML element names) into the
    /// target's first preferences section. Later source sections win.
    pub fn copy_preferences_subsections(&self, names: &[&str], target: &mut XmlState) {
        let mut selected = Vec::new();
        for preferences in self.preferences_sections() {
            for name in names {
                if let Some(values) = preferences.subsection(name) {
                    selected.push((name.to_string(), values.to_vec()));
                }
            }
        }
        if selected.is_empty() {
            return;
        }

        let target_preferences = target.preferences_section_mut();
        for (name, values) in selected {
            target_preferences.subsections.insert(name, values);
        }
    }

    /// Add packages marked `bootinclude` to the target's image packages and
    /// drop them from the target's delete list.
    pub fn copy_bootincluded_packages(&self, target: &mut XmlState) {
        let kinds = self.source_packages_kinds();
        let mut names: Vec<String> = Vec::new();
        for package in self
            .packages_sections(&kinds)
            .flat_map(|s| s.packages.iter())
            .filter(|p| p.bootinclude)
        {
            if !names.contains(&package.name) {
                names.push(package.name.clone());
            }
        }
        if names.is_empty() {
            return;
        }

        let image_packages = target.packages_section_mut("image");
        for name in &names {
            if !image_packages.contains_package(name) {
                image_packages.packages.push(Package::named(name.as_str()));
            }
        }

        let selected = target.profiles.clone();
        for delete in target
            .xml_data
            .packages
            .iter_mut()
            .filter(|p| p.kind == "delete" && p.is_active(&selected))
        {
            delete.packages.retain(|p| !names.contains(&p.name));
        }
    }

    /// Add archives marked `bootinclude` to the target's image packages.
    pub fn copy_bootincluded_archives(&self, target: &mut XmlState) {
        let kinds = self.source_packages_kinds();
        let names: Vec<String> = self
            .packages_sections(&kinds)
            .flat_map(|s| s.archives.iter())
            .filter(|a| a.bootinclude)
            .map(|a| a.name.clone())
            .collect();
        if names.is_empty() {
            return;
        }

        let image_packages = target.packages_section_mut("image");
        for name in names {
            if !image_packages.contains_archive(&name) {
                image_packages.archives.push(Archive {
                    name,
                    bootinclude: false,
                });
            }
        }
    }

    /// Add packages marked `bootdelete` to the target's delete packages.
    pub fn copy_bootdelete_packages(&self, target: &mut XmlState) {
        let kinds = self.source_packages_kinds();
        let names: Vec<String> = self
            .packages_sections(&kinds)
            .flat_map(|s| s.packages.iter())
            .filter(|p| p.bootdelete)
            .map(|p| p.name.clone())
            .collect();
        if names.is_empty() {
            return;
        }

        let delete_packages = target.packages_section_mut("delete");
        for name in names {
            if !delete_packages.contains_package(&name) {
                delete_packages.packages.push(Package::named(name));
            }
        }
    }

    /// Overwrite the target build type's attributes with the named ones set
    /// on this build type.
    pub fn copy_build_type_attributes(&self, names: &[&str], target: &mut XmlState) {
        let Some(source) = self.build_type() else {
            return;
        };
        let Some(target_type) = target.build_type_mut() else {
            return;
        };
        for name in names {
            if let Some(value) = source.attribute(name) {
                target_type.set_attribute(name, value);
            }
        }
    }

    fn copy_build_type_child(&self, name: &str, target: &mut XmlState) {
        let Some(element) = self.build_type().and_then(|t| t.child(name)) else {
            return;
        };
        if let Some(target_type) = target.build_type_mut() {
            target_type.set_child(element.clone());
        }
    }

    pub fn copy_systemdisk_section(&self, target: &mut XmlState) {
        self.copy_build_type_child("systemdisk", target);
    }

    pub fn copy_machine_section(&self, target: &mut XmlState) {
        self.copy_build_type_child("machine", target);
    }

    pub fn copy_oemconfig_section(&self, target: &mut XmlState) {
        self.copy_build_type_child("oemconfig", target);
    }
}

/// Clone a section without its profile scope; it was already resolved
/// against the source profiles.
fn unscoped<T: Clone + ClearProfiles>(section: &T) -> T {
    let mut section = section.clone();
    section.clear_profiles();
    section
}

trait ClearProfiles {
    fn clear_profiles(&mut self);
}

impl ClearProfiles for Repository {
    fn clear_profiles(&mut self) {
        self.profiles.clear();
    }
}

impl ClearProfiles for Drivers {
    fn clear_profiles(&mut self) {
        self.profiles.clear();
    }
}

impl ClearProfiles for Strip {
    fn clear_profiles(&mut self) {
        self.profiles.clear();
    }
}
