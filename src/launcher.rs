use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// Starts external commands on behalf of a matched pattern.
///
/// `launch` is fire-and-forget: implementations never report whether the
/// command could be started, how it exited, or what it printed. Callers must
/// not depend on any of that.
pub trait CommandLauncher: Send + Sync {
    fn launch(&self, command: &str);
}

/// Runs command strings through the platform shell.
///
/// Must be used from within a Tokio runtime; the child is reaped by a
/// background task.
#[derive(Debug, Clone, Default)]
pub struct ShellLauncher;

impl ShellLauncher {
    pub fn new() -> Self {
        Self
    }

    fn command(command: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        }
        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

impl CommandLauncher for ShellLauncher {
    fn launch(&self, command: &str) {
        let spawned = Self::command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                tokio::spawn(async move {
                    let _ = child.wait().await;
                });
            }
            Err(e) => debug!(command, error = %e, "Command could not be started"),
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every launched command instead of running it.
    #[derive(Debug, Default)]
    pub struct RecordingLauncher {
        pub launched: Mutex<Vec<String>>,
    }

    impl RecordingLauncher {
        pub fn commands(&self) -> Vec<String> {
            self.launched.lock().unwrap().clone()
        }
    }

    impl CommandLauncher for RecordingLauncher {
        fn launch(&self, command: &str) {
            self.launched.lock().unwrap().push(command.to_string());
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_launcher_runs_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        ShellLauncher::new().launch(&format!("touch '{}'", marker.display()));

        for _ in 0..100 {
            if marker.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("command never ran");
    }

    #[tokio::test]
    async fn shell_launcher_ignores_failures() {
        let launcher = ShellLauncher::new();
        launcher.launch("");
        launcher.launch("definitely-not-a-real-command-logspark");
        launcher.launch("exit 3");
    }
}
