//! Shared test utilities for boot image tests.

use anyhow::Result;
use boot_image::process::{CommandResult, CommandRunner};
use boot_image::{BootImageOptions, Defaults, XmlDescription, XmlState};
use std::cell::RefCell;
use std::fs;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::rc::Rc;
use std::sync::Arc;
use tempfile::TempDir;

/// Records commands instead of running them.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    pub calls: Rc<RefCell<Vec<Vec<String>>>>,
}

impl CommandRunner for RecordingRunner {
    fn run(&self, argv: &[String]) -> Result<CommandResult> {
        self.calls.borrow_mut().push(argv.to_vec());
        Ok(CommandResult {
            status: ExitStatus::from_raw(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

/// Temporary target directory plus a boot description tree.
pub struct TestEnv {
    /// Kept alive for the lifetime of the env
    pub _temp_dir: TempDir,
    /// Target directory of the boot image build
    pub target: PathBuf,
    /// Base path for relative boot description references
    pub boot_descriptions: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let target = temp_dir.path().join("target");
        let boot_descriptions = temp_dir.path().join("boot");
        fs::create_dir_all(&target).expect("Failed to create target dir");
        fs::create_dir_all(&boot_descriptions).expect("Failed to create boot dir");

        Self {
            _temp_dir: temp_dir,
            target,
            boot_descriptions,
        }
    }

    /// Write `config.xml` for the boot description `name`.
    pub fn write_boot_description(&self, name: &str, xml: &str) -> PathBuf {
        let dir = self.boot_descriptions.join(name);
        fs::create_dir_all(&dir).expect("Failed to create boot description dir");
        fs::write(dir.join("config.xml"), xml).expect("Failed to write config.xml");
        dir
    }

    pub fn defaults(&self) -> Defaults {
        Defaults {
            boot_description_path: self.boot_descriptions.clone(),
            strip_file: None,
        }
    }

    pub fn options(&self, runner: &RecordingRunner) -> BootImageOptions {
        BootImageOptions {
            arch: Some("x86_64".to_string()),
            defaults: self.defaults(),
            runner: Box::new(runner.clone()),
            ..Default::default()
        }
    }
}

pub fn system_state(xml: &str) -> Arc<XmlState> {
    let description = XmlDescription::parse(xml).expect("system description should parse");
    Arc::new(XmlState::new(description, vec![]))
}
