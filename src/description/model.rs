//! In-memory model of an image description.
//!
//! Only the sections the boot image core reads or copies are typed. Subtrees
//! that are copied wholesale (`systemdisk`, `machine`, `oemconfig`, ...) are
//! kept as generic [`Element`] nodes.

use std::collections::BTreeMap;

/// Generic XML element subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Sections that can be scoped to a set of profiles.
pub trait Profiled {
    fn profiles(&self) -> &[String];

    /// A section without profiles is always active.
    fn is_active(&self, selected: &[String]) -> bool {
        let own = self.profiles();
        own.is_empty() || own.iter().any(|p| selected.contains(p))
    }
}

macro_rules! impl_profiled {
    ($($ty:ty),* $(,)?) => {
        $(impl Profiled for $ty {
            fn profiles(&self) -> &[String] {
                &self.profiles
            }
        })*
    };
}

impl_profiled!(Preferences, Repository, Drivers, Strip, Packages);

/// `<profiles><profile/></profiles>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileDef {
    pub name: String,
    pub description: Option<String>,
    /// Selected when no profiles are requested explicitly.
    pub import: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub profiles: Vec<String>,
    /// Leaf subsections keyed by element name (`version`, `locale`, ...).
    pub subsections: BTreeMap<String, Vec<String>>,
    pub types: Vec<TypeSection>,
}

impl Preferences {
    pub fn subsection(&self, name: &str) -> Option<&[String]> {
        self.subsections
            .get(name)
            .map(Vec::as_slice)
            .filter(|values| !values.is_empty())
    }

    pub fn version(&self) -> Option<&str> {
        self.subsection("version")
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// `<type>` section of preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSection {
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Element>,
}

impl TypeSection {
    /// Build type name, e.g. `oem` or `iso`.
    pub fn image(&self) -> Option<&str> {
        self.attribute("image")
    }

    pub fn is_primary(&self) -> bool {
        self.attribute("primary") == Some("true")
    }

    /// Boot description reference.
    pub fn boot(&self) -> Option<&str> {
        self.attribute("boot")
    }

    pub fn bootprofile(&self) -> Option<&str> {
        self.attribute("bootprofile")
    }

    pub fn bootkernel(&self) -> Option<&str> {
        self.attribute("bootkernel")
    }

    /// Attribute value; empty values count as unset.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Replace every child named like `element` with `element`.
    pub fn set_child(&mut self, element: Element) {
        self.children.retain(|c| c.name != element.name);
        self.children.push(element);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repository {
    pub profiles: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drivers {
    pub profiles: Vec<String>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Strip {
    /// `delete`, `tools` or `libs`.
    pub kind: String,
    pub profiles: Vec<String>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub bootinclude: bool,
    pub bootdelete: bool,
}

impl Package {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    pub name: String,
    pub bootinclude: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packages {
    /// `image`, `bootstrap`, `delete` or a build type name.
    pub kind: String,
    pub profiles: Vec<String>,
    pub packages: Vec<Package>,
    pub archives: Vec<Archive>,
}

impl Packages {
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn contains_package(&self, name: &str) -> bool {
        self.packages.iter().any(|p| p.name == name)
    }

    pub fn contains_archive(&self, name: &str) -> bool {
        self.archives.iter().any(|a| a.name == name)
    }
}

/// A loaded `<image>` description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDescription {
    pub name: String,
    pub displayname: Option<String>,
    pub profiles: Vec<ProfileDef>,
    pub preferences: Vec<Preferences>,
    pub repositories: Vec<Repository>,
    pub drivers: Vec<Drivers>,
    pub strip: Vec<Strip>,
    pub packages: Vec<Packages>,
}
