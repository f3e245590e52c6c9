//! External command execution with live output forwarding.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! Cmd::new("sh")
//!     .arg("install.sh")
//!     .cwd(out_dir)
//!     .envs([("VSCT_DEV", "true")])
//!     .stream("dev")?;
//! ```

use anyhow::{Context, Result, bail};
use std::{
    ffi::{OsStr, OsString},
    io::{BufRead, BufReader, Read},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    thread,
};

// ============================================================================
// Builder API
// ============================================================================

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
}

impl Cmd {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Add a single argument; empty arguments are skipped.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs.push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Run to completion, forwarding output line by line as it arrives.
    ///
    /// Stdout goes to the info log through a [`LineForwarder`]; stderr goes
    /// to the error log. A non-zero exit status is an error.
    pub fn stream(self, module: &'static str) -> Result<ExitStatus> {
        let name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        let stderr = child.stderr.take();
        let stderr_thread = thread::spawn(move || {
            if let Some(stderr) = stderr {
                forward_lines(stderr, |line| crate::error!(module; "{}", line));
            }
        });

        if let Some(stdout) = child.stdout.take() {
            let mut forwarder = LineForwarder::new();
            forward_lines(stdout, |line| {
                if forwarder.accept(line) {
                    crate::log!(module; "{}", line);
                }
            });
        }

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for `{name}`"))?;
        stderr_thread.join().ok();

        if !status.success() {
            bail!("Command `{name}` failed with {status}");
        }
        Ok(status)
    }
}

/// Call `sink` for every line read from `reader` until EOF.
fn forward_lines(reader: impl Read, mut sink: impl FnMut(&str)) {
    for line in BufReader::new(reader).lines() {
        match line {
            Ok(line) => sink(line.trim_end()),
            Err(_) => break,
        }
    }
}

// ============================================================================
// Output dedup
// ============================================================================

/// Drops a line identical to the one forwarded just before it.
///
/// One forwarder per output stream; state is never shared between streams
/// or between runs.
#[derive(Debug, Default)]
pub struct LineForwarder {
    last: Option<String>,
}

impl LineForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `line` should be forwarded. Records it as the latest line.
    pub fn accept(&mut self, line: &str) -> bool {
        if self.last.as_deref() == Some(line) {
            return false;
        }
        self.last = Some(line.to_string());
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::new("sh")
            .arg("install.sh")
            .arg("")
            .cwd("/tmp")
            .envs([("VSCT_DEV", "true")]);

        assert_eq!(cmd.program, OsString::from("sh"));
        assert_eq!(cmd.args.len(), 1);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(cmd.envs.len(), 1);
    }

    #[test]
    fn test_line_forwarder_drops_consecutive_duplicates() {
        let mut forwarder = LineForwarder::new();
        let lines = ["a", "a", "b", "a", "a"];
        let forwarded: Vec<_> = lines.iter().filter(|l| forwarder.accept(l)).collect();
        assert_eq!(forwarded, [&"a", &"b", &"a"]);
    }

    #[test]
    fn test_forwarders_are_independent() {
        let mut first = LineForwarder::new();
        let mut second = LineForwarder::new();
        assert!(first.accept("same"));
        assert!(second.accept("same"));
        assert!(!first.accept("same"));
    }

    #[test]
    fn test_forward_lines() {
        let mut seen = Vec::new();
        forward_lines("one\ntwo \r\nthree".as_bytes(), |line| seen.push(line.to_string()));
        assert_eq!(seen, ["one", "two", "three"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_stream_status() {
        assert!(Cmd::new("sh").arg("-c").arg("echo hi").stream("test").is_ok());

        let err = Cmd::new("sh").arg("-c").arg("exit 3").stream("test").unwrap_err();
        assert!(err.to_string().contains("failed"));
    }
}
