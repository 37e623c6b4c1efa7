#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway config, PID file location and fake external programs
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub source_dir: PathBuf,
}

impl TestEnvironment {
    /// Environment whose fake rsync exits with `rsync_exit`
    pub fn new(rsync_exit: i32) -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let source_dir = temp_dir.path().join("library").join("2025");
        fs::create_dir_all(&source_dir)?;
        fs::write(source_dir.join("track.mp3"), b"ID3")?;

        let env = TestEnvironment { temp_dir, source_dir };
        env.write_fake_rsync(rsync_exit)?;
        env.write_fake_daemon()?;
        env.write_config()?;
        Ok(env)
    }

    /// Environment whose fake rsync records its args, then sleeps until
    /// signalled
    pub fn with_slow_rsync() -> anyhow::Result<Self> {
        let env = Self::new(0)?;
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\nexec sleep 30\n",
            env.rsync_args_file().display()
        );
        write_executable(&env.path().join("fake-rsync"), &script)?;
        Ok(env)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.path().join("rsyncd.pid")
    }

    /// Arguments the fake rsync was last called with, one per line
    pub fn rsync_args_file(&self) -> PathBuf {
        self.path().join("rsync-args")
    }

    /// Created by the fake daemon launcher whenever it runs
    pub fn daemon_marker(&self) -> PathBuf {
        self.path().join("daemon-launched")
    }

    pub fn source(&self) -> String {
        self.source_dir.display().to_string()
    }

    /// Recorded rsync arguments, if rsync ran
    pub fn rsync_args(&self) -> Option<Vec<String>> {
        fs::read_to_string(self.rsync_args_file())
            .ok()
            .map(|content| content.lines().map(str::to_string).collect())
    }

    /// `cratesync` preconfigured with this environment's config file
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("cratesync").unwrap();
        cmd.env_remove("RUST_LOG");
        cmd.arg("--config").arg(self.config_path());
        cmd
    }

    pub fn write_pid(&self, pid: u32) {
        fs::write(self.pid_file(), format!("{}\n", pid)).unwrap();
    }

    fn write_fake_rsync(&self, exit: i32) -> anyhow::Result<()> {
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\nexit {}\n",
            self.rsync_args_file().display(),
            exit
        );
        write_executable(&self.path().join("fake-rsync"), &script)
    }

    /// Launcher that backgrounds a long sleep and records its pid, the way
    /// a self-daemonizing rsync writes its PID file
    fn write_fake_daemon(&self) -> anyhow::Result<()> {
        let script = format!(
            "#!/bin/sh\ntouch '{}'\nsleep 30 >/dev/null 2>&1 </dev/null &\necho $! > '{}'\n",
            self.daemon_marker().display(),
            self.pid_file().display()
        );
        write_executable(&self.path().join("fake-daemon"), &script)
    }

    fn write_config(&self) -> anyhow::Result<()> {
        let config = format!(
            r#"
[remote]
host = "media.test"
user = "dj"
port = 12000

[modes.music]
destination = "navidrome"

[modes.prefs]
destination = "rekordbox"

[daemon]
pid_file = "{pid_file}"
program = "{daemon}"
args = ["--daemon"]
config_file = "{dir}/rsyncd.conf"
startup_grace_ms = 5000

[transfer]
program = "{rsync}"
"#,
            pid_file = self.pid_file().display(),
            daemon = self.path().join("fake-daemon").display(),
            dir = self.path().display(),
            rsync = self.path().join("fake-rsync").display(),
        );
        fs::write(self.config_path(), config)?;
        Ok(())
    }
}

fn write_executable(path: &Path, content: &str) -> anyhow::Result<()> {
    fs::write(path, content)?;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Send SIGTERM to a pid left behind by a test, ignoring errors
pub fn cleanup_pid(pid: u32) {
    let _ = nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(pid as i32),
        nix::sys::signal::Signal::SIGTERM,
    );
}
