#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use serde_json::Value;
use tempfile::TempDir;

pub const TEST_BUCKET: &str = "my-bucket";
pub const TEST_FILE_SIZE: usize = 1024;

/// Writing a script and executing it from parallel tests can fail with ETXTBSY,
/// so every test that runs the binary holds this lock.
static PROCESS_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub struct TestHelper {
    pub source_dir: TempDir,
    pub log_dir: TempDir,
    pub tool_dir: TempDir,
    pub files: Vec<PathBuf>,
    _lock: MutexGuard<'static, ()>,
}

impl TestHelper {
    pub fn new() -> Self {
        let lock = PROCESS_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        Self {
            source_dir: tempfile::tempdir().unwrap(),
            log_dir: tempfile::tempdir().unwrap(),
            tool_dir: tempfile::tempdir().unwrap(),
            files: Vec::new(),
            _lock: lock,
        }
    }

    pub fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }

    pub fn create_source_files(&mut self, count: usize) {
        for i in 0..count {
            let path = self.source_dir.path().join(format!("file_{i:02}.dat"));
            fs::write(&path, vec![b'x'; TEST_FILE_SIZE]).unwrap();
            self.files.push(path);
        }
    }

    /// A stand-in for s5cmd that prints one completion line per listed file and exits.
    pub fn write_fake_s5cmd(&self, completed: &[PathBuf], failed: &[PathBuf], exit_code: i32) -> PathBuf {
        let mut script = String::from("#!/bin/sh\n");
        for path in completed {
            let name = path.file_name().unwrap().to_string_lossy();
            script.push_str(&format!(
                "echo 'cp {} s3://{TEST_BUCKET}/{name}'\n",
                path.display()
            ));
        }
        for path in failed {
            script.push_str(&format!(
                "echo 'ERROR \"cp {}\": access denied'\n",
                path.display()
            ));
        }
        script.push_str(&format!("exit {exit_code}\n"));

        let tool = self.tool_dir.path().join("s5cmd");
        fs::write(&tool, script).unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        tool
    }

    pub fn run_datasync(&self, source: &Path, tool: &Path, options: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_datasync"))
            .arg("--source-dir")
            .arg(source)
            .arg("--s3-bucket")
            .arg(TEST_BUCKET)
            .arg("--tool-path")
            .arg(tool)
            .arg("--log-dir")
            .arg(self.log_dir.path())
            .arg("--skip-destination-check")
            .arg("-qq")
            .args(options)
            .output()
            .unwrap()
    }

    pub fn files_in_log_dir(&self, extension: &str) -> Vec<PathBuf> {
        fs::read_dir(self.log_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().is_some_and(|ext| ext == extension))
            .collect()
    }

    pub fn read_single_report(&self) -> Value {
        let reports = self.files_in_log_dir("json");
        assert_eq!(reports.len(), 1, "{reports:?}");

        serde_json::from_str(&fs::read_to_string(&reports[0]).unwrap()).unwrap()
    }

    pub fn read_single_log(&self) -> String {
        let logs = self.files_in_log_dir("log");
        assert_eq!(logs.len(), 1, "{logs:?}");

        fs::read_to_string(&logs[0]).unwrap()
    }
}
