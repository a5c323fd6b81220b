use crate::layout::Layout;
use crate::registry::Service;
use crate::{CoreError, Result};
use log::{debug, info};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// What a start or stop applies to.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Stack,
    Service(&'a Service),
}

impl Target<'_> {
    fn fragment(&self) -> &'static str {
        match self {
            Target::Stack => "",
            Target::Service(service) => service.command_fragment(),
        }
    }
}

/// Fully built argument vector for an elevated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegedCommand {
    program: String,
    args: Vec<String>,
}

impl PrivilegedCommand {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for PrivilegedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// Launches a command without waiting for it.
pub trait CommandSpawner {
    fn spawn_detached(&self, command: &PrivilegedCommand) -> Result<()>;
}

/// Spawns real processes. A short-lived thread reaps the child so it does not
/// linger as a zombie; nobody looks at the exit status.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedSpawner;

impl CommandSpawner for DetachedSpawner {
    fn spawn_detached(&self, command: &PrivilegedCommand) -> Result<()> {
        let mut child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| CoreError::Spawn {
                program: PathBuf::from(command.program()),
                source,
            })?;

        let label = command.to_string();
        let reaper = thread::Builder::new()
            .name("lampp-reaper".to_string())
            .spawn(move || match child.wait() {
                Ok(status) => debug!("`{label}` finished with {status}"),
                Err(err) => debug!("failed to reap `{label}`: {err}"),
            });
        if let Err(err) = reaper {
            debug!("could not start reaper thread: {err}");
        }
        Ok(())
    }
}

/// Issues privileged `lampp` commands.
#[derive(Debug, Clone)]
pub struct ActionDispatcher<S = DetachedSpawner> {
    layout: Layout,
    spawner: S,
}

impl<S: CommandSpawner> ActionDispatcher<S> {
    pub fn new(layout: Layout, spawner: S) -> Self {
        ActionDispatcher { layout, spawner }
    }

    pub fn start(&self, target: Target<'_>) -> Result<PrivilegedCommand> {
        self.dispatch(self.lampp_command("start", target))
    }

    pub fn stop(&self, target: Target<'_>) -> Result<PrivilegedCommand> {
        self.dispatch(self.lampp_command("stop", target))
    }

    /// Restart is only offered for the whole stack.
    pub fn restart(&self) -> Result<PrivilegedCommand> {
        self.dispatch(self.lampp_command("reload", Target::Stack))
    }

    /// Open the bundled manager GUI with the caller's display.
    pub fn launch_control_panel(&self) -> Result<PrivilegedCommand> {
        let manager = self.layout.manager_binary()?;
        let mut args = Vec::new();
        if self.layout.use_pkexec() {
            let display: Vec<String> = ["DISPLAY", "XAUTHORITY"]
                .iter()
                .filter_map(|name| env::var(name).ok().map(|value| format!("{name}={value}")))
                .collect();
            if !display.is_empty() {
                args.push("env".to_string());
                args.extend(display);
            }
        }
        args.push(path_arg(&manager));
        self.dispatch(self.elevated(args))
    }

    /// `[pkexec] <root>/lampp <subcommand><fragment>`.
    pub fn lampp_command(&self, subcommand: &str, target: Target<'_>) -> PrivilegedCommand {
        self.elevated(vec![
            path_arg(&self.layout.control_binary()),
            format!("{subcommand}{}", target.fragment()),
        ])
    }

    fn elevated(&self, mut args: Vec<String>) -> PrivilegedCommand {
        if self.layout.use_pkexec() {
            PrivilegedCommand {
                program: "pkexec".to_string(),
                args,
            }
        } else {
            let program = args.remove(0);
            PrivilegedCommand { program, args }
        }
    }

    fn dispatch(&self, command: PrivilegedCommand) -> Result<PrivilegedCommand> {
        info!("dispatching `{command}`");
        self.spawner.spawn_detached(&command)?;
        Ok(command)
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::{ActionDispatcher, CommandSpawner, DetachedSpawner, PrivilegedCommand, Target};
    use crate::testing::RecordingSpawner;
    use crate::{CoreError, Layout, ServiceRegistry};

    fn dispatcher(use_pkexec: bool) -> (ActionDispatcher<RecordingSpawner>, RecordingSpawner) {
        let spawner = RecordingSpawner::default();
        let layout = Layout::default().with_pkexec(use_pkexec);
        (ActionDispatcher::new(layout, spawner.clone()), spawner)
    }

    #[test]
    fn service_actions_carry_fragment() {
        let registry = ServiceRegistry::lampp();
        let (dispatcher, spawner) = dispatcher(true);
        let ftp = registry.get("PROFTPD").expect("ftp is registered");

        dispatcher.start(Target::Service(ftp)).expect("start dispatches");
        dispatcher.stop(Target::Service(ftp)).expect("stop dispatches");

        assert_eq!(
            spawner.argvs(),
            vec![
                vec!["pkexec", "/opt/lampp/lampp", "startftp"],
                vec!["pkexec", "/opt/lampp/lampp", "stopftp"],
            ]
        );
    }

    #[test]
    fn stack_actions_have_no_suffix() {
        let (dispatcher, spawner) = dispatcher(true);
        dispatcher.start(Target::Stack).expect("start dispatches");
        dispatcher.restart().expect("restart dispatches");
        assert_eq!(
            spawner.argvs(),
            vec![
                vec!["pkexec", "/opt/lampp/lampp", "start"],
                vec!["pkexec", "/opt/lampp/lampp", "reload"],
            ]
        );
    }

    #[test]
    fn runs_directly_without_pkexec() {
        let (dispatcher, _) = dispatcher(false);
        let command = dispatcher.lampp_command("stop", Target::Stack);
        assert_eq!(command.program(), "/opt/lampp/lampp");
        assert_eq!(command.to_string(), "/opt/lampp/lampp stop");
    }

    #[test]
    fn spawn_failure_is_reported() {
        let (dispatcher, spawner) = dispatcher(true);
        spawner.fail_spawns(true);
        match dispatcher.restart() {
            Err(CoreError::Spawn { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn control_panel_requires_manager_binary() {
        let spawner = RecordingSpawner::default();
        let layout = Layout::default().with_root("/nonexistent/lampp-root");
        let dispatcher = ActionDispatcher::new(layout, spawner.clone());
        match dispatcher.launch_control_panel() {
            Err(CoreError::MissingAsset(path)) => {
                assert!(path.ends_with("manager-linux.run"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(spawner.argvs().is_empty());
    }

    #[test]
    fn detached_spawner_does_not_wait() {
        let command = PrivilegedCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 7".to_string()],
        };
        DetachedSpawner
            .spawn_detached(&command)
            .expect("sh should spawn");

        let missing = PrivilegedCommand {
            program: "/nonexistent/pkexec".to_string(),
            args: Vec::new(),
        };
        assert!(DetachedSpawner.spawn_detached(&missing).is_err());
    }
}
