use gtk4::glib;
use lampp_core::{ScheduledTask, Scheduler};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// One-shot timeouts on the GLib main loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlibScheduler;

impl Scheduler for GlibScheduler {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce()>) -> ScheduledTask {
        // Removing a source that already fired panics, so the id is dropped
        // as soon as the timeout runs.
        let source: Rc<RefCell<Option<glib::SourceId>>> = Rc::default();
        let fired = Rc::clone(&source);
        let id = glib::timeout_add_local_once(delay, move || {
            fired.borrow_mut().take();
            task();
        });
        *source.borrow_mut() = Some(id);

        ScheduledTask::new(move || {
            if let Some(id) = source.borrow_mut().take() {
                id.remove();
            }
        })
    }
}
