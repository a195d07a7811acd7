//! External command execution utilities.
//!
//! The optimizer is the only external process; it reads its inputs from
//! stdin and answers on stdout, with diagnostics on stderr.

use crate::log;
use anyhow::{Context, Result};
use regex::Regex;
use std::{
    borrow::Cow,
    ffi::OsString,
    io::{ErrorKind, Write},
    process::{Command, Output, Stdio},
    sync::OnceLock,
    thread,
};

// ============================================================================
// Command Execution
// ============================================================================

/// Run `cmd` + `args`, feed `input` to its stdin and collect everything.
///
/// A non-zero exit is *not* an error here: callers inspect `status` together
/// with stderr, since a failing compiler still reports useful diagnostics.
///
/// # Errors
/// Returns error if the command cannot be spawned or waited on.
pub fn exec_with_input(cmd: &[String], args: &[OsString], input: Vec<u8>) -> Result<Output> {
    let cmd: Vec<OsString> = cmd.iter().map(OsString::from).collect();
    let (name, mut command) = prepare(&cmd, args)?;

    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to spawn `{name}`"))?;

    // Feed stdin from a separate thread so a child filling its stdout pipe
    // cannot deadlock against us.
    let mut stdin = child.stdin.take().context("Failed to acquire stdin")?;
    let writer = thread::spawn(move || stdin.write_all(&input));

    let output = child
        .wait_with_output()
        .with_context(|| format!("{name} process failed"))?;

    let written = writer
        .join()
        .map_err(|_| anyhow::anyhow!("stdin writer for `{name}` panicked"))?;
    match written {
        // The child exited before reading everything; its status says why.
        Err(err) if err.kind() == ErrorKind::BrokenPipe => {}
        other => other.with_context(|| format!("Failed to write stdin of `{name}`"))?,
    }

    Ok(output)
}

/// Prepare a Command from components.
fn prepare(cmd: &[OsString], args: &[OsString]) -> Result<(String, Command)> {
    let name = cmd
        .first()
        .and_then(|s| s.to_str())
        .context("Empty command")?
        .to_owned();

    let mut command = Command::new(&cmd[0]);
    command.args(&cmd[1..]).args(args.iter().filter(|a| !a.is_empty()));

    Ok((name, command))
}

// ============================================================================
// Output Filtering
// ============================================================================

pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("static regex"));
    re.replace_all(s, "")
}

/// Filter rule for skipping output lines with known prefixes.
pub struct FilterRule {
    /// Prefixes to match at the start of output lines.
    pub skip_prefixes: &'static [&'static str],
}

impl FilterRule {
    pub const fn new(skip_prefixes: &'static [&'static str]) -> Self {
        Self { skip_prefixes }
    }

    fn should_skip(&self, output: &str) -> bool {
        output.is_empty() || self.skip_prefixes.iter().any(|p| output.starts_with(p))
    }

    /// Lines of `output` that survive the filter, ANSI codes removed.
    pub fn retain(&self, output: &str) -> Vec<String> {
        output
            .lines()
            .map(|line| strip_ansi(line).trim_end().to_owned())
            .filter(|line| !self.should_skip(line.trim()))
            .collect()
    }

    /// Log surviving lines under `name`.
    pub fn log(&self, name: &str, output: &str) {
        let lines = self.retain(output);
        if !lines.is_empty() {
            log!(name; "{}", lines.join("\n"));
        }
    }
}

/// Format command error message with filtering.
pub fn format_error(name: &str, output: &Output, filter: &FilterRule) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut msg = format!("Command `{name}` failed with {}\n", output.status);
    let kept = filter.retain(&stderr);
    if !kept.is_empty() {
        msg.push_str(&kept.join("\n"));
    }

    // Stdout is machine output (JSON); only show it when it is not.
    let stdout_trimmed = stdout.trim();
    if !stdout_trimmed.is_empty() && !stdout_trimmed.starts_with(['[', '{']) {
        msg.push_str("\nStdout:\n");
        msg.push_str(stdout_trimmed);
    }
    msg
}

// ============================================================================
// Tests
// ============================================================================
