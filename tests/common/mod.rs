//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Isolated home + data file for one test run of the `platewatch` binary.
pub struct TestEnv {
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            temp_dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn data_file(&self) -> PathBuf {
        self.temp_dir.path().join("registered_plates.json")
    }

    pub fn read_data_file(&self) -> String {
        std::fs::read_to_string(self.data_file()).expect("read data file")
    }

    /// Run the binary with `args`, pointing all config lookups into the temp dir.
    pub fn run(&self, args: &[&str]) -> Output {
        self.run_with_env(args, &[])
    }

    /// Like [`TestEnv::run`], with extra environment variables set last.
    pub fn run_with_env(&self, args: &[&str], vars: &[(&str, &str)]) -> Output {
        let home = self.temp_dir.path().join("home");
        std::fs::create_dir_all(&home).expect("create fake home");
        let mut command = Command::new(env!("CARGO_BIN_EXE_platewatch"));
        command
            .args(args)
            .arg("--data-file")
            .arg(self.data_file())
            .env("HOME", &home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .env_remove("PLATEWATCH_DATA_FILE")
            .env_remove("PLATEWATCH_API_ENDPOINT")
            .env_remove("PLATEWATCH_DISCORD_TOKEN")
            .env_remove("RUST_LOG");
        for (key, value) in vars {
            command.env(key, value);
        }
        command.output().expect("run platewatch")
    }

    /// Run and return stdout, asserting a zero exit status.
    pub fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "platewatch {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).expect("stdout is UTF-8")
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}
