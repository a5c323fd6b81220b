//! Toggle state machine.
//!
//! Every control is either idle or pending. An accepted intent marks its
//! control pending, dispatches a privileged command and hands back a
//! [`Deferred`] that the owner of the event loop must fire once, after the
//! delay, through [`ReconciliationController::complete`].
use crate::dispatcher::{ActionDispatcher, CommandSpawner, Target};
use crate::probe::ProcessProbe;
use crate::registry::ServiceRegistry;
use crate::resolver::StatusResolver;
use crate::{CoreError, ServiceStatus, StatusSnapshot};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlId {
    Service(String),
    StackToggle,
    StackRestart,
}

impl ControlId {
    fn is_stack(&self) -> bool {
        matches!(self, ControlId::StackToggle | ControlId::StackRestart)
    }

    /// Stack controls act on every service, so they overlap with any control.
    fn overlaps(&self, other: &ControlId) -> bool {
        self == other || self.is_stack() || other.is_stack()
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlId::Service(id) => write!(f, "service {id}"),
            ControlId::StackToggle => f.write_str("stack start/stop"),
            ControlId::StackRestart => f.write_str("stack restart"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Starting,
    Stopping,
    Restarting,
}

impl PendingAction {
    pub fn verb(self) -> &'static str {
        match self {
            PendingAction::Starting => "Starting",
            PendingAction::Stopping => "Stopping",
            PendingAction::Restarting => "Restarting",
        }
    }
}

/// A user request coming from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    ToggleService(String),
    ToggleStack,
    RestartStack,
}

impl Intent {
    pub fn control(&self) -> ControlId {
        match self {
            Intent::ToggleService(id) => ControlId::Service(id.clone()),
            Intent::ToggleStack => ControlId::StackToggle,
            Intent::RestartStack => ControlId::StackRestart,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorIcon {
    Active,
    Inactive,
}

impl IndicatorIcon {
    pub fn for_status(master: ServiceStatus) -> Self {
        if master.is_running() {
            IndicatorIcon::Active
        } else {
            IndicatorIcon::Inactive
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            IndicatorIcon::Active => "lampp.svg",
            IndicatorIcon::Inactive => "lampp-dark.svg",
        }
    }
}

/// Everything the controller needs from the presentation layer.
pub trait ControlSurface {
    fn set_label(&mut self, control: &ControlId, label: &str);
    fn set_enabled(&mut self, control: &ControlId, enabled: bool);
    /// Last resolved status of a service; its control is checked when running.
    fn set_status(&mut self, service_id: &str, status: ServiceStatus);
    fn set_icon(&mut self, icon: IndicatorIcon);
}

/// Reconciliation owed for a pending control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred {
    pub control: ControlId,
    pub delay: Duration,
}

enum Command {
    Start(Option<String>),
    Stop(Option<String>),
    Restart,
}

pub struct ReconciliationController<P, S, U> {
    registry: ServiceRegistry,
    resolver: StatusResolver<P>,
    dispatcher: ActionDispatcher<S>,
    surface: U,
    snapshot: StatusSnapshot,
    pending: HashMap<ControlId, PendingAction>,
    delay: Duration,
}

impl<P, S, U> ReconciliationController<P, S, U>
where
    P: ProcessProbe,
    S: CommandSpawner,
    U: ControlSurface,
{
    pub fn new(
        registry: ServiceRegistry,
        resolver: StatusResolver<P>,
        dispatcher: ActionDispatcher<S>,
        surface: U,
        delay: Duration,
    ) -> Self {
        let snapshot = StatusSnapshot::unknown(&registry);
        ReconciliationController {
            registry,
            resolver,
            dispatcher,
            surface,
            snapshot,
            pending: HashMap::new(),
            delay,
        }
    }

    pub fn dispatcher(&self) -> &ActionDispatcher<S> {
        &self.dispatcher
    }

    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    pub fn surface(&self) -> &U {
        &self.surface
    }

    pub fn pending(&self, control: &ControlId) -> Option<PendingAction> {
        self.pending.get(control).copied()
    }

    pub fn is_pending(&self, control: &ControlId) -> bool {
        self.pending.contains_key(control)
    }

    /// A pending control that `control` must wait for, itself included.
    pub fn blocker(&self, control: &ControlId) -> Option<(&ControlId, PendingAction)> {
        self.pending
            .iter()
            .find(|(pending, _)| pending.overlaps(control))
            .map(|(pending, action)| (pending, *action))
    }

    pub fn master_status(&self) -> ServiceStatus {
        self.snapshot.status(self.registry.master_id())
    }

    /// Startup pass: resolve once and render every control.
    pub fn initialize(&mut self) {
        self.snapshot = self.resolver.resolve(&self.registry);
        self.render_idle_controls();
        self.surface.set_icon(self.icon());
    }

    /// Accept an intent if nothing overlapping it is pending.
    ///
    /// Returns `None` when the intent was dropped; nothing is dispatched then.
    pub fn submit(&mut self, intent: Intent) -> Option<Deferred> {
        let control = intent.control();
        if let Some((pending, action)) = self.blocker(&control) {
            warn!("ignoring {intent:?}: {pending} is still {}", action.verb().to_lowercase());
            return None;
        }

        let master_running = self.master_status().is_running();
        let (action, label, command) = match &intent {
            Intent::ToggleService(id) => {
                let Some(service) = self.registry.get(id) else {
                    warn!("{}", CoreError::UnknownService(id.clone()));
                    return None;
                };
                let service_id = Some(service.id().to_string());
                if self.snapshot.is_running(id) {
                    let label = format!("Stopping {}…", service.label());
                    (PendingAction::Stopping, label, Command::Stop(service_id))
                } else {
                    let label = format!("Starting {}…", service.label());
                    (PendingAction::Starting, label, Command::Start(service_id))
                }
            }
            Intent::ToggleStack if master_running => (
                PendingAction::Stopping,
                "Stopping…".to_string(),
                Command::Stop(None),
            ),
            Intent::ToggleStack => (
                PendingAction::Starting,
                "Starting…".to_string(),
                Command::Start(None),
            ),
            Intent::RestartStack => {
                if !master_running {
                    warn!(
                        "ignoring restart: {} is {}",
                        self.registry.master().label(),
                        self.master_status()
                    );
                    return None;
                }
                (
                    PendingAction::Restarting,
                    "Restarting…".to_string(),
                    Command::Restart,
                )
            }
        };

        self.pending.insert(control.clone(), action);
        self.surface.set_enabled(&control, false);
        self.surface.set_label(&control, &label);
        if action == PendingAction::Restarting {
            self.surface.set_icon(IndicatorIcon::Inactive);
        }
        self.render_idle_controls();

        // The outcome is only learned from the deferred status pass.
        if let Err(err) = self.dispatch(command) {
            warn!("{control}: {err}");
        }
        info!("{control} is {}, re-checking in {:?}", action.verb().to_lowercase(), self.delay);

        Some(Deferred {
            control,
            delay: self.delay,
        })
    }

    /// Finish a pending control: resolve, render, re-enable.
    ///
    /// Returns `false` when the control was not pending.
    pub fn complete(&mut self, control: &ControlId) -> bool {
        let Some(action) = self.pending.remove(control) else {
            debug!("{control} has nothing pending");
            return false;
        };

        self.snapshot = self.resolver.resolve(&self.registry);
        self.render_idle_controls();
        self.surface.set_icon(self.icon());

        info!(
            "{control} done {}, {} is {}",
            action.verb().to_lowercase(),
            self.registry.master().label(),
            self.master_status()
        );
        true
    }

    fn dispatch(&self, command: Command) -> crate::Result<()> {
        match &command {
            Command::Start(id) => self.dispatcher.start(self.target(id.as_deref())?)?,
            Command::Stop(id) => self.dispatcher.stop(self.target(id.as_deref())?)?,
            Command::Restart => self.dispatcher.restart()?,
        };
        Ok(())
    }

    fn target(&self, service_id: Option<&str>) -> crate::Result<Target<'_>> {
        match service_id {
            None => Ok(Target::Stack),
            Some(id) => self
                .registry
                .get(id)
                .map(Target::Service)
                .ok_or_else(|| CoreError::UnknownService(id.to_string())),
        }
    }

    /// Render every idle control from the snapshot. Pending controls keep
    /// their transient label; idle ones overlapping a pending control are
    /// disabled until it completes.
    fn render_idle_controls(&mut self) {
        for service in self.registry.services() {
            let control = ControlId::Service(service.id().to_string());
            if self.pending.contains_key(&control) {
                continue;
            }
            let enabled = self.blocker(&control).is_none();
            self.surface.set_label(&control, service.label());
            self.surface.set_enabled(&control, enabled);
            self.surface
                .set_status(service.id(), self.snapshot.status(service.id()));
        }

        let running = self.master_status().is_running();
        if !self.pending.contains_key(&ControlId::StackToggle) {
            let enabled = self.blocker(&ControlId::StackToggle).is_none();
            let label = if running { "Stop" } else { "Start" };
            self.surface.set_label(&ControlId::StackToggle, label);
            self.surface.set_enabled(&ControlId::StackToggle, enabled);
        }
        if !self.pending.contains_key(&ControlId::StackRestart) {
            let enabled = running && self.blocker(&ControlId::StackRestart).is_none();
            self.surface.set_label(&ControlId::StackRestart, "Restart");
            self.surface.set_enabled(&ControlId::StackRestart, enabled);
        }
    }

    fn icon(&self) -> IndicatorIcon {
        if self.pending.contains_key(&ControlId::StackRestart) {
            IndicatorIcon::Inactive
        } else {
            IndicatorIcon::for_status(self.master_status())
        }
    }
}
