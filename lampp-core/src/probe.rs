use crate::layout::Layout;
use crate::{CoreError, Result};
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Read-only sources of liveness information.
///
/// Implementations return whatever the underlying command printed. A non-zero
/// exit status is not an error; only a command that could not run at all is.
pub trait ProcessProbe {
    /// Raw `SERVICE_KEY STATE_TOKEN` report, header line included.
    fn status_query(&self) -> Result<String>;

    /// Raw process table, one process per line.
    fn process_list(&self) -> Result<String>;
}

/// Probe backed by `lampp statusraw` and `ps -e`.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    control_binary: PathBuf,
    ps_command: PathBuf,
}

impl CommandProbe {
    pub fn new(layout: &Layout) -> Self {
        CommandProbe {
            control_binary: layout.control_binary(),
            ps_command: PathBuf::from("ps"),
        }
    }
}

impl ProcessProbe for CommandProbe {
    fn status_query(&self) -> Result<String> {
        // `lampp` may ask for confirmation when not run as root; answer no.
        run_read_only("status", &self.control_binary, &["statusraw"], Some("n\n"))
    }

    fn process_list(&self) -> Result<String> {
        run_read_only("process", &self.ps_command, &["-e"], None)
    }
}

pub(crate) fn run_read_only(
    probe: &'static str,
    program: &Path,
    args: &[&str],
    answer: Option<&str>,
) -> Result<String> {
    let unavailable = |source| CoreError::ProbeUnavailable {
        probe,
        program: program.to_path_buf(),
        source,
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if answer.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let mut child = command.spawn().map_err(unavailable)?;
    if let (Some(answer), Some(mut stdin)) = (answer, child.stdin.take()) {
        // The command may exit without reading; a broken pipe is harmless here.
        if let Err(err) = stdin.write_all(answer.as_bytes()) {
            debug!("{probe} probe did not accept input: {err}");
        }
    }

    let output = child.wait_with_output().map_err(unavailable)?;
    if !output.status.success() {
        debug!("{probe} probe {program:?} exited with {}", output.status);
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::run_read_only;
    use crate::CoreError;
    use std::path::Path;

    #[test]
    fn captures_output_of_failing_command() {
        let output = run_read_only(
            "status",
            Path::new("sh"),
            &["-c", "echo header; echo APACHE RUNNING; exit 3"],
            None,
        )
        .expect("non-zero exit must not be an error");
        assert_eq!(output, "header\nAPACHE RUNNING\n");
    }

    #[test]
    fn answers_confirmation_prompt() {
        let output = run_read_only(
            "status",
            Path::new("sh"),
            &["-c", "read answer; echo \"answer=$answer\""],
            Some("n\n"),
        )
        .expect("probe should run");
        assert_eq!(output.trim(), "answer=n");
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let err = run_read_only("status", Path::new("/nonexistent/lampp"), &["statusraw"], None)
            .expect_err("missing binary must fail");
        match err {
            CoreError::ProbeUnavailable { probe, .. } => assert_eq!(probe, "status"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
