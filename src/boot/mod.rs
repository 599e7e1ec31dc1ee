//! Boot image (initrd) build context.
//!
//! - [`image`] - Boot root lifecycle, boot description loading and the
//!   [`BootImage`] strategy trait
//! - [`merge`] - Import of system description elements into the boot
//!   description

pub mod image;
pub mod merge;

pub use image::{
    BootImage, BootImageBase, BootImageOptions, DEFAULT_BOOT_IMAGE_PROFILE,
    DEFAULT_BOOT_KERNEL_PROFILE,
};
pub use merge::{
    import_system_description_elements, BUILD_TYPE_ATTRIBUTES, MERGE_STEPS, PREFERENCES_SUBSECTIONS,
};
