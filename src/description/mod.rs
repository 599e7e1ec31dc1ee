//! Image description loading.
//!
//! - [`model`] - Typed sections of an `<image>` description
//! - [`state`] - Profile-scoped view with the copy operations used to build
//!   a boot description from a system description

pub mod model;
pub mod state;

pub use model::{
    Archive, Drivers, Element, ImageDescription, Package, Packages, Preferences, ProfileDef,
    Profiled, Repository, Strip, TypeSection,
};
pub use state::XmlState;

use anyhow::{Context, Result};
use roxmltree::Node;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DescriptionError;

/// A description file on disk.
#[derive(Debug, Clone)]
pub struct XmlDescription {
    path: PathBuf,
}

impl XmlDescription {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the description.
    pub fn load(&self) -> Result<ImageDescription> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading description '{}'", self.path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("loading description '{}'", self.path.display()))
    }

    /// Parse description text.
    pub fn parse(text: &str) -> Result<ImageDescription> {
        let doc = roxmltree::Document::parse(text).map_err(DescriptionError::from)?;
        let root = doc.root_element();
        if root.tag_name().name() != "image" {
            return Err(DescriptionError::UnexpectedRoot(root.tag_name().name().to_string()).into());
        }

        let mut description = ImageDescription {
            name: required(root, "image", "name")?,
            displayname: root.attribute("displayname").map(str::to_string),
            ..Default::default()
        };

        for child in elements(root) {
            match child.tag_name().name() {
                "profiles" => {
                    for profile in elements(child).filter(|n| n.has_tag_name("profile")) {
                        description.profiles.push(ProfileDef {
                            name: required(profile, "profile", "name")?,
                            description: profile.attribute("description").map(str::to_string),
                            import: flag(profile, "import"),
                        });
                    }
                }
                "preferences" => description.preferences.push(parse_preferences(child)),
                "repository" => description.repositories.push(parse_repository(child)?),
                "drivers" => description.drivers.push(Drivers {
                    profiles: profiles(child),
                    files: file_names(child)?,
                }),
                "strip" => description.strip.push(Strip {
                    kind: required(child, "strip", "type")?,
                    profiles: profiles(child),
                    files: file_names(child)?,
                }),
                "packages" => description.packages.push(parse_packages(child)?),
                _ => {}
            }
        }

        Ok(description)
    }
}

fn parse_preferences(node: Node) -> Preferences {
    let mut preferences = Preferences {
        profiles: profiles(node),
        ..Default::default()
    };

    for child in elements(node) {
        if child.has_tag_name("type") {
            let element = Element::from(child);
            preferences.types.push(TypeSection {
                attributes: element.attributes,
                children: element.children,
            });
        } else {
            preferences
                .subsections
                .entry(child.tag_name().name().to_string())
                .or_default()
                .push(child.text().map(str::trim).unwrap_or_default().to_string());
        }
    }

    preferences
}

fn parse_repository(node: Node) -> Result<Repository> {
    let source = elements(node)
        .find(|n| n.has_tag_name("source"))
        .map(|n| required(n, "source", "path"))
        .transpose()?
        .unwrap_or_default();

    let element = Element::from(node);
    let mut attributes = element.attributes;
    attributes.remove("profiles");

    Ok(Repository {
        profiles: profiles(node),
        attributes,
        source,
    })
}

fn parse_packages(node: Node) -> Result<Packages> {
    let mut packages = Packages {
        kind: required(node, "packages", "type")?,
        profiles: profiles(node),
        ..Default::default()
    };

    for child in elements(node) {
        match child.tag_name().name() {
            "package" => packages.packages.push(Package {
                name: required(child, "package", "name")?,
                bootinclude: flag(child, "bootinclude"),
                bootdelete: flag(child, "bootdelete"),
            }),
            "archive" => packages.archives.push(Archive {
                name: required(child, "archive", "name")?,
                bootinclude: flag(child, "bootinclude"),
            }),
            _ => {}
        }
    }

    Ok(packages)
}

impl From<Node<'_, '_>> for Element {
    fn from(node: Node) -> Self {
        Element {
            name: node.tag_name().name().to_string(),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            text: node
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            children: elements(node).map(Element::from).collect(),
        }
    }
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn required(node: Node, element: &'static str, attribute: &'static str) -> Result<String> {
    node.attribute(attribute)
        .map(str::to_string)
        .ok_or_else(|| DescriptionError::MissingAttribute { element, attribute }.into())
}

fn flag(node: Node, attribute: &str) -> bool {
    node.attribute(attribute) == Some("true")
}

fn profiles(node: Node) -> Vec<String> {
    node.attribute("profiles")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn file_names(node: Node) -> Result<Vec<String>> {
    elements(node)
        .filter(|n| n.has_tag_name("file"))
        .map(|n| required(n, "file", "name"))
        .collect()
}
