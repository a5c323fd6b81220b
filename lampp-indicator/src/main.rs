mod formatting;
mod launchers;
mod timeout;
mod ui;

use gtk::glib;
use gtk4 as gtk;
use lampp_core::{
    ActionDispatcher, CommandProbe, DetachedSpawner, Intent, Layout, Reconciler,
    ReconciliationController, ServiceRegistry, StatusResolver,
};
use launchers::Launchers;
use libadwaita::{self as adw, Application, prelude::*};
use log::{info, warn};
use std::rc::Rc;
use timeout::GlibScheduler;

type IndicatorReconciler = Reconciler<CommandProbe, DetachedSpawner, ui::AppWidgets, GlibScheduler>;

fn main() -> glib::ExitCode {
    env_logger::init();
    adw::init().expect("Failed to initialize libadwaita");

    let app = Application::builder()
        .application_id("io.github.lampp.Indicator")
        .build();

    app.connect_activate(|app| {
        // A second launch re-activates this instance; it must not get its own controller.
        if let Some(window) = app.active_window() {
            window.present();
            return;
        }
        let controller = AppController::new(app, Layout::from_env());
        controller.request_initial_load();
    });

    app.run()
}

struct AppController {
    app: Application,
    layout: Layout,
    launchers: Launchers,
    reconciler: IndicatorReconciler,
    widgets: ui::AppWidgets,
}

impl AppController {
    fn new(app: &Application, layout: Layout) -> Rc<Self> {
        let registry = ServiceRegistry::lampp();
        let widgets = ui::AppWidgets::new(app, &registry, &layout);

        let controller = ReconciliationController::new(
            registry,
            StatusResolver::new(CommandProbe::new(&layout)),
            ActionDispatcher::new(layout.clone(), DetachedSpawner),
            widgets.clone(),
            layout.refresh_delay(),
        );

        let controller = Rc::new(Self {
            app: app.clone(),
            launchers: Launchers::new(layout.clone()),
            reconciler: Reconciler::new(controller, GlibScheduler),
            layout,
            widgets,
        });
        controller.setup_handlers();
        controller
    }

    fn setup_handlers(self: &Rc<Self>) {
        let register_intent = |button: &gtk::Button, intent: Intent| {
            let controller = Rc::clone(self);
            button.connect_clicked(move |_| {
                controller.submit(intent.clone());
            });
        };

        register_intent(&self.widgets.stack_toggle, Intent::ToggleStack);
        register_intent(&self.widgets.stack_restart, Intent::RestartStack);
        for (service_id, button) in self.widgets.service_buttons() {
            register_intent(&button, Intent::ToggleService(service_id));
        }

        let register_launcher = |button: &gtk::Button, launch: fn(&AppController)| {
            let controller = Rc::clone(self);
            button.connect_clicked(move |_| launch(&controller));
        };

        register_launcher(&self.widgets.open_data_dir, AppController::open_data_dir);
        register_launcher(&self.widgets.edit_config, AppController::edit_config);
        register_launcher(&self.widgets.open_admin, AppController::open_admin);
        register_launcher(&self.widgets.control_panel, AppController::launch_control_panel);
        register_launcher(&self.widgets.about, AppController::show_about);
        register_launcher(&self.widgets.quit, AppController::quit);
    }

    fn request_initial_load(self: &Rc<Self>) {
        info!("using LAMPP installation at {}", self.layout.root().display());
        if !self.layout.control_binary().exists() {
            self.widgets.show_error(&format!(
                "{} not found; service status will be unknown",
                self.layout.control_binary().display()
            ));
        }
        self.reconciler.initialize();
    }

    fn submit(&self, intent: Intent) {
        if !self.reconciler.submit(intent.clone()) {
            warn!("{intent:?} was not accepted");
        }
    }

    fn open_data_dir(&self) {
        self.report(self.launchers.open_data_dir());
    }

    fn edit_config(&self) {
        self.report(self.launchers.edit_config());
    }

    fn open_admin(&self) {
        self.report(self.launchers.open_admin());
    }

    fn launch_control_panel(&self) {
        let result = self
            .reconciler
            .controller()
            .borrow()
            .dispatcher()
            .launch_control_panel()
            .map(|_| ())
            .map_err(|err| err.to_string());
        self.report(result);
    }

    fn show_about(&self) {
        self.widgets.show_about(&self.layout);
    }

    fn quit(&self) {
        self.app.quit();
    }

    fn report(&self, result: Result<(), String>) {
        if let Err(err) = result {
            warn!("{err}");
            self.widgets.show_toast(&format!("Operation failed: {err}"));
        }
    }
}
