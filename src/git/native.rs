use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, Level};

use crate::config::GitConfig;
use crate::domain::SemVer;
use crate::error::{Result, VersionError};
use crate::git::{bot_message, merge_message, tag_message, Repository};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Repository backend invoking the system `git` executable
pub struct NativeGit {
    root: PathBuf,
    remote: String,
    skip_push: bool,
    timeout: Duration,
}

impl NativeGit {
    /// Open the repository containing `path`
    pub fn open(path: &Path, config: &GitConfig) -> Result<Self> {
        let mut git = NativeGit {
            root: path.to_path_buf(),
            remote: config.remote.clone(),
            skip_push: config.skip_push,
            timeout: config.timeout(),
        };
        let toplevel = git.perform(&["rev-parse", "--show-toplevel"])?;
        git.root = PathBuf::from(toplevel.trim());
        Ok(git)
    }

    fn git_cmd(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.root);
        // Fail instead of waiting for credentials on a terminal nobody watches
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd
    }

    /// Run a mutating command, logging branch, status and output
    fn git(&self, args: &[&str]) -> Result<String> {
        if tracing::enabled!(Level::DEBUG) {
            if let Ok(branch) = self.current_branch() {
                debug!("GIT: On branch {}", branch);
            }
            if let Ok(status) = self.perform(&["status", "--short"]) {
                status.lines().for_each(|line| debug!("GIT: {}", line));
            }
        }
        info!("GIT: git {}", args.join(" "));
        let output = self.perform(args)?;
        output.lines().for_each(|line| info!("GIT: {}", line));
        Ok(output)
    }

    /// Run a command under the timeout, returning stdout
    fn perform(&self, args: &[&str]) -> Result<String> {
        let command = args.join(" ");
        let mut child = self
            .git_cmd()
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                VersionError::repository(&command, None, format!("Failed to execute git: {}", e))
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child, &command)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            stderr.lines().for_each(|line| error!("GIT: {}", line));
            let mut captured = stderr.trim().to_string();
            if !stdout.trim().is_empty() {
                if !captured.is_empty() {
                    captured.push('\n');
                }
                captured.push_str(stdout.trim());
            }
            return Err(VersionError::repository(command, status.code(), captured));
        }

        stderr.lines().for_each(|line| debug!("GIT: {}", line));
        Ok(stdout)
    }

    fn wait(&self, child: &mut Child, command: &str) -> Result<ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VersionError::Timeout {
                    command: command.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn checkout_remote(&self, branch: &str) -> Result<()> {
        let start_point = format!("{}/{}", self.remote, branch);
        self.git(&["checkout", "-f", "-B", branch, &start_point])?;
        Ok(())
    }

    fn has_local_branch(&self, branch: &str) -> bool {
        let refname = format!("refs/heads/{}", branch);
        self.perform(&["show-ref", "--verify", "--quiet", &refname]).is_ok()
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn is_conflict(output: &str) -> bool {
    output.contains("CONFLICT") || output.contains("Automatic merge failed")
}

impl Repository for NativeGit {
    fn current_branch(&self) -> Result<String> {
        let branch = self.perform(&["branch", "--show-current"])?;
        let branch = branch.trim();
        if branch.is_empty() {
            return Err(VersionError::DetachedHead);
        }
        Ok(branch.to_string())
    }

    fn stage(&self, pathspec: &str) -> Result<()> {
        self.git(&["add", pathspec])?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.git(&["commit", "-m", &bot_message(message)])?;
        Ok(())
    }

    fn tag(&self, version: &SemVer) -> Result<()> {
        let name = version.to_string();
        self.git(&["tag", "-a", &name, "-m", &tag_message(version)])?;
        Ok(())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        info!("GIT: Try checkout local");
        match self.git(&["checkout", branch]) {
            Ok(_) => Ok(()),
            // Only a missing local branch may be recreated from the remote
            Err(e @ VersionError::Repository { .. }) if self.has_local_branch(branch) => Err(e),
            Err(VersionError::Repository { .. }) => {
                info!("GIT: Failed. Try checkout remote");
                self.checkout_remote(branch)
            }
            Err(e) => Err(e),
        }
    }

    fn merge(&self, branch: &str) -> Result<()> {
        match self.git(&["merge", branch, "--no-edit", "-m", &merge_message(branch)]) {
            Ok(_) => Ok(()),
            Err(VersionError::Repository { stderr, .. }) if is_conflict(&stderr) => {
                Err(VersionError::merge_conflict(branch, stderr))
            }
            Err(e) => Err(e),
        }
    }

    fn push(&self) -> Result<()> {
        if self.skip_push {
            info!("GIT: Skip push!");
            return Ok(());
        }
        self.git(&["push", "--all", &self.remote])?;
        self.git(&["push", "--tags", &self.remote])?;
        Ok(())
    }

    fn workdir(&self) -> &Path {
        &self.root
    }
}
