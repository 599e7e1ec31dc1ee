//! Boot image (initrd) build context for OS image builds.
//!
//! This crate prepares what a boot image strategy needs before it can build
//! an initrd for a system image:
//!
//! - **Boot description resolution** - Locate and load the boot-specific
//!   description referenced by the system build type, scoped to the boot
//!   image and boot kernel profiles
//! - **Description merge** - Copy a fixed set of sections and attributes from
//!   the system description into the boot description
//! - **Boot root lifecycle** - Create the scratch tree the initrd is assembled
//!   in, name the initrd artifact, and remove self-created directories again
//! - **Strategy contract** - The [`BootImage`] trait concrete initrd builders
//!   implement
//!
//! # Architecture
//!
//! ```text
//! system config.xml ──► XmlState ──┐
//!                                  │ get_boot_description_directory()
//!                                  ▼
//! boot config.xml ──► XmlState (profiles: bootprofile, bootkernel)
//!                                  │ import_system_description_elements()
//!                                  ▼
//!                     BootImageBase ◄── BootImage::prepare / create_initrd
//!                       ├── boot root directory (boot-image.*)
//!                       └── {target}/{name}.{arch}-{version}.initrd
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use boot_image::{BootImageBase, XmlDescription, XmlState};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let description = XmlDescription::new("image/config.xml").load()?;
//! let system = Arc::new(XmlState::new(description, vec![]));
//!
//! let mut base = BootImageBase::new(system, Path::new("/var/tmp/build"), None)?;
//! base.load_boot_xml_description()?;
//! base.import_system_description_elements()?;
//! ```

pub mod boot;
pub mod defaults;
pub mod description;
pub mod error;
pub mod preflight;
pub mod process;

pub use boot::{BootImage, BootImageBase, BootImageOptions};
pub use defaults::Defaults;
pub use description::{ImageDescription, XmlDescription, XmlState};
pub use error::{BootImageError, DescriptionError};
