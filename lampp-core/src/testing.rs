//! Test doubles shared by the unit tests.
use crate::controller::{ControlId, ControlSurface, IndicatorIcon, ReconciliationController};
use crate::dispatcher::{ActionDispatcher, CommandSpawner, PrivilegedCommand};
use crate::probe::ProcessProbe;
use crate::resolver::StatusResolver;
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::{CoreError, Layout, Result, ServiceRegistry, ServiceStatus};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

/// Probe with scripted output. `None` behaves like a missing binary.
#[derive(Clone, Default)]
pub struct FakeProbe {
    status: Rc<RefCell<Option<String>>>,
    processes: Rc<RefCell<Option<String>>>,
    passes: Rc<Cell<usize>>,
}

impl FakeProbe {
    pub fn new(status: Option<&str>, processes: Option<&str>) -> Self {
        let probe = FakeProbe::default();
        probe.set_status(status);
        probe.set_processes(processes);
        probe
    }

    pub fn set_status(&self, status: Option<&str>) {
        *self.status.borrow_mut() = status.map(str::to_string);
    }

    pub fn set_processes(&self, processes: Option<&str>) {
        *self.processes.borrow_mut() = processes.map(str::to_string);
    }

    /// Number of status queries served so far.
    pub fn passes(&self) -> usize {
        self.passes.get()
    }

    fn answer(probe: &'static str, output: &RefCell<Option<String>>) -> Result<String> {
        output
            .borrow()
            .clone()
            .ok_or_else(|| CoreError::ProbeUnavailable {
                probe,
                program: PathBuf::from(probe),
                source: Error::from(ErrorKind::NotFound),
            })
    }
}

impl ProcessProbe for FakeProbe {
    fn status_query(&self) -> Result<String> {
        self.passes.set(self.passes.get() + 1);
        Self::answer("status", &self.status)
    }

    fn process_list(&self) -> Result<String> {
        Self::answer("process", &self.processes)
    }
}

#[derive(Clone, Default)]
pub struct RecordingSpawner {
    commands: Rc<RefCell<Vec<PrivilegedCommand>>>,
    fail: Rc<Cell<bool>>,
}

impl RecordingSpawner {
    pub fn fail_spawns(&self, fail: bool) {
        self.fail.set(fail);
    }

    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.commands
            .borrow()
            .iter()
            .map(|command| command.argv().into_iter().map(str::to_string).collect())
            .collect()
    }
}

impl CommandSpawner for RecordingSpawner {
    fn spawn_detached(&self, command: &PrivilegedCommand) -> Result<()> {
        if self.fail.get() {
            return Err(CoreError::Spawn {
                program: PathBuf::from(command.program()),
                source: Error::from(ErrorKind::PermissionDenied),
            });
        }
        self.commands.borrow_mut().push(command.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    labels: HashMap<ControlId, String>,
    enabled: HashMap<ControlId, bool>,
    statuses: HashMap<String, ServiceStatus>,
    icon: Option<IndicatorIcon>,
}

impl RecordingSurface {
    pub fn label(&self, control: &ControlId) -> &str {
        self.labels.get(control).map(String::as_str).unwrap_or("")
    }

    pub fn enabled(&self, control: &ControlId) -> bool {
        self.enabled.get(control).copied().unwrap_or(false)
    }

    /// Whether the service control is rendered checked.
    pub fn active(&self, service_id: &str) -> bool {
        self.status(service_id).is_some_and(ServiceStatus::is_running)
    }

    pub fn status(&self, service_id: &str) -> Option<ServiceStatus> {
        self.statuses.get(service_id).copied()
    }

    pub fn icon(&self) -> Option<IndicatorIcon> {
        self.icon
    }
}

impl ControlSurface for RecordingSurface {
    fn set_label(&mut self, control: &ControlId, label: &str) {
        self.labels.insert(control.clone(), label.to_string());
    }

    fn set_enabled(&mut self, control: &ControlId, enabled: bool) {
        self.enabled.insert(control.clone(), enabled);
    }

    fn set_status(&mut self, service_id: &str, status: ServiceStatus) {
        self.statuses.insert(service_id.to_string(), status);
    }

    fn set_icon(&mut self, icon: IndicatorIcon) {
        self.icon = Some(icon);
    }
}

struct Timer {
    id: u64,
    due: Duration,
    task: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: u64,
    timers: Vec<Timer>,
}

/// Scheduler driven by hand through [`ManualScheduler::advance`].
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Rc<RefCell<Clock>>,
}

impl ManualScheduler {
    pub fn queued(&self) -> usize {
        self.clock.borrow().timers.len()
    }

    /// Move time forward and run every task that became due, oldest first.
    pub fn advance(&self, by: Duration) {
        let mut due = {
            let mut clock = self.clock.borrow_mut();
            clock.now += by;
            let now = clock.now;
            let (due, waiting): (Vec<Timer>, Vec<Timer>) =
                clock.timers.drain(..).partition(|timer| timer.due <= now);
            clock.timers = waiting;
            due
        };
        due.sort_by_key(|timer| (timer.due, timer.id));
        for timer in due {
            (timer.task)();
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> ScheduledTask {
        let id = {
            let mut clock = self.clock.borrow_mut();
            let id = clock.next_id;
            clock.next_id += 1;
            let due = clock.now + delay;
            clock.timers.push(Timer { id, due, task });
            id
        };
        let clock = Rc::clone(&self.clock);
        ScheduledTask::new(move || clock.borrow_mut().timers.retain(|timer| timer.id != id))
    }
}

pub type TestController = ReconciliationController<FakeProbe, RecordingSpawner, RecordingSurface>;

/// Controller over the LAMPP registry with the default layout and delay.
pub fn controller(probe: FakeProbe, spawner: RecordingSpawner) -> TestController {
    let layout = Layout::default();
    ReconciliationController::new(
        ServiceRegistry::lampp(),
        StatusResolver::new(probe),
        ActionDispatcher::new(layout.clone(), spawner),
        RecordingSurface::default(),
        layout.refresh_delay(),
    )
}
