//! Unprivileged helpers: file manager, editor, browser.
use lampp_core::Layout;
use log::{debug, info};
use std::env;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

const OPENER: &str = "xdg-open";

#[derive(Clone)]
pub struct Launchers {
    layout: Layout,
}

impl Launchers {
    pub fn new(layout: Layout) -> Self {
        Launchers { layout }
    }

    pub fn open_data_dir(&self) -> Result<(), String> {
        let dir = self.layout.data_dir();
        require_path(&dir)?;
        spawn(OPENER, &[], dir.as_os_str())
    }

    /// `$EDITOR` when set, the desktop's default handler otherwise.
    pub fn edit_config(&self) -> Result<(), String> {
        let config = self.layout.config_file();
        require_path(&config)?;
        match editor_command(env::var("EDITOR").ok().as_deref()) {
            Some((program, args)) => spawn(&program, &args, config.as_os_str()),
            None => spawn(OPENER, &[], config.as_os_str()),
        }
    }

    pub fn open_admin(&self) -> Result<(), String> {
        spawn(OPENER, &[], OsStr::new(self.layout.admin_url()))
    }
}

fn require_path(path: &Path) -> Result<(), String> {
    if path.exists() {
        Ok(())
    } else {
        Err(format!("{} does not exist", path.display()))
    }
}

/// Split `$EDITOR` into a program and its leading arguments.
fn editor_command(editor: Option<&str>) -> Option<(String, Vec<String>)> {
    let mut parts = editor?.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

fn spawn(program: &str, args: &[String], target: &OsStr) -> Result<(), String> {
    info!("launching {program} {}", target.to_string_lossy());
    let mut child = Command::new(program)
        .args(args)
        .arg(target)
        .stdin(Stdio::null())
        .spawn()
        .map_err(|err| format!("Failed to launch {program}: {err}"))?;

    let program = program.to_string();
    let reaper = thread::Builder::new()
        .name("launcher-reaper".to_string())
        .spawn(move || {
            if let Err(err) = child.wait() {
                debug!("failed to reap {program}: {err}");
            }
        });
    if let Err(err) = reaper {
        debug!("could not start reaper thread: {err}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::editor_command;

    #[test]
    fn splits_editor_arguments() {
        assert_eq!(
            editor_command(Some("code --wait")),
            Some(("code".to_string(), vec!["--wait".to_string()]))
        );
        assert_eq!(editor_command(Some("gedit")), Some(("gedit".to_string(), Vec::new())));
        assert_eq!(editor_command(Some("   ")), None);
        assert_eq!(editor_command(None), None);
    }
}
