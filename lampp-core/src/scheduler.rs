//! Deferred reconciliation on a single-threaded event loop.
use crate::controller::{ControlSurface, Intent, ReconciliationController};
use crate::dispatcher::CommandSpawner;
use crate::probe::ProcessProbe;
use log::warn;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Runs a task once after a delay, on the thread that owns the controller.
pub trait Scheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> ScheduledTask;
}

/// Handle to a scheduled task. Dropping it leaves the task scheduled.
#[must_use = "dropping the handle keeps the task scheduled; call `cancel` to abort it"]
pub struct ScheduledTask {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl ScheduledTask {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        ScheduledTask {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Binds a [`ReconciliationController`] to a [`Scheduler`]: accepted intents
/// get their completion scheduled after the controller's delay.
pub struct Reconciler<P, S, U, T> {
    controller: Rc<RefCell<ReconciliationController<P, S, U>>>,
    scheduler: T,
}

impl<P, S, U, T> Reconciler<P, S, U, T>
where
    P: ProcessProbe + 'static,
    S: CommandSpawner + 'static,
    U: ControlSurface + 'static,
    T: Scheduler,
{
    pub fn new(controller: ReconciliationController<P, S, U>, scheduler: T) -> Self {
        Reconciler {
            controller: Rc::new(RefCell::new(controller)),
            scheduler,
        }
    }

    pub fn controller(&self) -> &Rc<RefCell<ReconciliationController<P, S, U>>> {
        &self.controller
    }

    pub fn initialize(&self) {
        self.controller.borrow_mut().initialize();
    }

    /// Returns whether the intent was accepted.
    pub fn submit(&self, intent: Intent) -> bool {
        let deferred = match self.controller.try_borrow_mut() {
            Ok(mut controller) => controller.submit(intent),
            Err(_) => {
                warn!("controller busy, dropping {intent:?}");
                return false;
            }
        };
        let Some(deferred) = deferred else {
            return false;
        };

        let controller = Rc::clone(&self.controller);
        let control = deferred.control;
        // Never cancelled; the handle is only kept by schedulers that need it.
        let _task = self.scheduler.schedule_once(
            deferred.delay,
            Box::new(move || {
                controller.borrow_mut().complete(&control);
            }),
        );
        true
    }
}
