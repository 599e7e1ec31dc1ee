//! Preflight checks for boot image builds.
//!
//! Validates that the host provides the tools the boot image core shells
//! out to, before a build creates any directories.
//!
//! # Example
//!
//! ```rust
//! use boot_image::preflight::{check_required_tools, command_exists};
//!
//! if !command_exists("rm") {
//!     println!("coreutils not installed");
//! }
//!
//! let tools = &[("rm", "coreutils"), ("uname", "coreutils")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

/// Check if a command exists in PATH.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Host tools used by the boot image core.
///
/// Each tuple is (command_name, package_name).
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[("rm", "coreutils"), ("uname", "coreutils")];

/// Check that specific tools are available.
///
/// Fails with the list of missing tools and the packages providing them.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<_> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Check all tools in [`REQUIRED_TOOLS`].
pub fn check_host_tools() -> Result<()> {
    check_required_tools(REQUIRED_TOOLS)
}
