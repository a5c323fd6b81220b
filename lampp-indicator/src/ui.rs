use crate::formatting::{
    StatusLevel, about_comments, icon_tooltip, service_tooltip, status_indicator_color,
    status_level, summary_text,
};
use gtk::cairo;
use gtk4 as gtk;
use lampp_core::{ControlId, ControlSurface, IndicatorIcon, Layout, ServiceRegistry, ServiceStatus};
use libadwaita::{self as adw, prelude::*};
use log::error;
use std::cell::RefCell;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::rc::Rc;

#[derive(Clone)]
struct ControlWidgets {
    button: gtk::Button,
    label: gtk::Label,
}

#[derive(Clone)]
struct ServiceIndicator {
    label: String,
    dot: gtk::DrawingArea,
}

/// Widget handles for the indicator window. Clones share the same widgets.
#[derive(Clone)]
pub struct AppWidgets {
    pub stack_toggle: gtk::Button,
    pub stack_restart: gtk::Button,
    pub open_data_dir: gtk::Button,
    pub edit_config: gtk::Button,
    pub open_admin: gtk::Button,
    pub control_panel: gtk::Button,
    pub about: gtk::Button,
    pub quit: gtk::Button,
    window: adw::ApplicationWindow,
    toast_overlay: adw::ToastOverlay,
    banner: adw::Banner,
    status_icon: gtk::Image,
    summary_label: gtk::Label,
    controls: HashMap<ControlId, ControlWidgets>,
    service_order: Vec<String>,
    indicators: HashMap<String, ServiceIndicator>,
    statuses: Rc<RefCell<HashMap<String, ServiceStatus>>>,
    layout: Layout,
}

fn build_status_indicator(level: StatusLevel) -> gtk::DrawingArea {
    let indicator = gtk::DrawingArea::builder()
        .content_width(12)
        .content_height(12)
        .build();
    configure_indicator(&indicator, level);
    indicator
}

fn configure_indicator(indicator: &gtk::DrawingArea, level: StatusLevel) {
    let color = status_indicator_color(level);
    let (r, g, b, a) = (color.red(), color.green(), color.blue(), color.alpha());
    indicator.set_draw_func(move |_, ctx, width, height| {
        ctx.set_antialias(cairo::Antialias::Best);
        ctx.set_source_rgba(r.into(), g.into(), b.into(), a.into());
        let size = width.min(height) as f64;
        let radius = (size / 2.0).max(1.0) - 1.0;
        ctx.arc(
            f64::from(width) / 2.0,
            f64::from(height) / 2.0,
            radius,
            0.0,
            2.0 * PI,
        );
        let _ = ctx.fill();
    });
    indicator.queue_draw();
}

fn control_button(text: &str, indicator: Option<&gtk::DrawingArea>) -> ControlWidgets {
    let label = gtk::Label::builder().label(text).xalign(0.0).hexpand(true).build();
    let content = gtk::Box::builder()
        .orientation(gtk::Orientation::Horizontal)
        .spacing(10)
        .build();
    if let Some(indicator) = indicator {
        content.append(indicator);
    }
    content.append(&label);
    let button = gtk::Button::builder().child(&content).build();
    ControlWidgets { button, label }
}

fn menu_button(text: &str) -> gtk::Button {
    let label = gtk::Label::builder().label(text).xalign(0.0).build();
    gtk::Button::builder()
        .child(&label)
        .css_classes(["flat"])
        .build()
}

fn section() -> gtk::Box {
    gtk::Box::builder()
        .orientation(gtk::Orientation::Vertical)
        .spacing(6)
        .build()
}

impl AppWidgets {
    pub fn new(app: &adw::Application, registry: &ServiceRegistry, layout: &Layout) -> Self {
        gtk::Window::set_default_icon_name("lampp-indicator");
        let window = adw::ApplicationWindow::builder()
            .application(app)
            .title("LAMPP")
            .default_width(300)
            .resizable(false)
            .build();

        let toast_overlay = adw::ToastOverlay::new();
        let toolbar_view = adw::ToolbarView::new();
        toast_overlay.set_child(Some(&toolbar_view));

        let status_icon = gtk::Image::builder().pixel_size(24).build();
        let header = adw::HeaderBar::new();
        let window_title = adw::WindowTitle::builder().title("LAMPP").build();
        header.set_title_widget(Some(&window_title));
        header.pack_start(&status_icon);
        toolbar_view.add_top_bar(&header);

        let banner = adw::Banner::new("");
        banner.set_revealed(false);
        banner.set_button_label(Some("Dismiss"));
        let banner_clone = banner.clone();
        banner.connect_button_clicked(move |_| {
            banner_clone.set_revealed(false);
        });
        toolbar_view.add_top_bar(&banner);

        let summary_label = gtk::Label::builder()
            .xalign(0.0)
            .wrap(true)
            .css_classes(["subtitle"])
            .label("Checking services…")
            .build();

        let mut controls = HashMap::new();

        let stack_toggle = control_button("Start", None);
        stack_toggle.button.add_css_class("suggested-action");
        let stack_restart = control_button("Restart", None);
        let stack_row = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(6)
            .homogeneous(true)
            .build();
        stack_row.append(&stack_toggle.button);
        stack_row.append(&stack_restart.button);

        let services_box = section();
        let mut service_order = Vec::new();
        let mut indicators = HashMap::new();
        for service in registry.services() {
            let dot = build_status_indicator(status_level(ServiceStatus::Unknown));
            let widgets = control_button(service.label(), Some(&dot));
            services_box.append(&widgets.button);
            service_order.push(service.id().to_string());
            indicators.insert(
                service.id().to_string(),
                ServiceIndicator {
                    label: service.label().to_string(),
                    dot,
                },
            );
            controls.insert(ControlId::Service(service.id().to_string()), widgets);
        }

        let open_data_dir = menu_button("Open htdocs Folder");
        let edit_config = menu_button("Edit httpd.conf");
        let open_admin = menu_button("Open Dashboard");
        let control_panel = menu_button("Control Panel");
        let tools_box = section();
        tools_box.append(&open_data_dir);
        tools_box.append(&edit_config);
        tools_box.append(&open_admin);
        tools_box.append(&control_panel);

        let about = menu_button("About");
        let quit = menu_button("Quit");
        let app_box = section();
        app_box.append(&about);
        app_box.append(&quit);

        let content = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(12)
            .margin_top(16)
            .margin_bottom(16)
            .margin_start(16)
            .margin_end(16)
            .build();
        content.append(&summary_label);
        content.append(&stack_row);
        content.append(&gtk::Separator::new(gtk::Orientation::Horizontal));
        content.append(&services_box);
        content.append(&gtk::Separator::new(gtk::Orientation::Horizontal));
        content.append(&tools_box);
        content.append(&gtk::Separator::new(gtk::Orientation::Horizontal));
        content.append(&app_box);

        toolbar_view.set_content(Some(&content));
        window.set_content(Some(&toast_overlay));
        window.present();

        let stack_toggle_button = stack_toggle.button.clone();
        let stack_restart_button = stack_restart.button.clone();
        controls.insert(ControlId::StackToggle, stack_toggle);
        controls.insert(ControlId::StackRestart, stack_restart);

        AppWidgets {
            stack_toggle: stack_toggle_button,
            stack_restart: stack_restart_button,
            open_data_dir,
            edit_config,
            open_admin,
            control_panel,
            about,
            quit,
            window,
            toast_overlay,
            banner,
            status_icon,
            summary_label,
            controls,
            service_order,
            indicators,
            statuses: Rc::default(),
            layout: layout.clone(),
        }
    }

    /// Toggle buttons in registry order.
    pub fn service_buttons(&self) -> Vec<(String, gtk::Button)> {
        self.service_order
            .iter()
            .filter_map(|id| {
                self.controls
                    .get(&ControlId::Service(id.clone()))
                    .map(|widgets| (id.clone(), widgets.button.clone()))
            })
            .collect()
    }

    pub fn show_error(&self, message: &str) {
        self.banner.set_title(message);
        self.banner.set_button_label(Some("Dismiss"));
        self.banner.set_revealed(true);
    }

    pub fn show_toast(&self, text: &str) {
        let toast = adw::Toast::builder().title(text).timeout(3).build();
        self.toast_overlay.add_toast(toast);
    }

    pub fn show_about(&self, layout: &Layout) {
        let about = adw::AboutWindow::builder()
            .transient_for(&self.window)
            .modal(true)
            .application_name("LAMPP Indicator")
            .application_icon("lampp-indicator")
            .version(env!("CARGO_PKG_VERSION"))
            .comments(about_comments(layout))
            .license_type(gtk::License::MitX11)
            .build();
        about.present();
    }

    fn update_summary(&self) {
        let statuses = self.statuses.borrow();
        let running = statuses.values().filter(|status| status.is_running()).count();
        self.summary_label
            .set_text(&summary_text(running, self.service_order.len()));
    }
}

impl ControlSurface for AppWidgets {
    fn set_label(&mut self, control: &ControlId, label: &str) {
        if let Some(widgets) = self.controls.get(control) {
            widgets.label.set_text(label);
        }
    }

    fn set_enabled(&mut self, control: &ControlId, enabled: bool) {
        if let Some(widgets) = self.controls.get(control) {
            widgets.button.set_sensitive(enabled);
        }
    }

    fn set_status(&mut self, service_id: &str, status: ServiceStatus) {
        if let Some(indicator) = self.indicators.get(service_id) {
            configure_indicator(&indicator.dot, status_level(status));
            indicator
                .dot
                .set_tooltip_text(Some(service_tooltip(&indicator.label, status).as_str()));
        }
        self.statuses
            .borrow_mut()
            .insert(service_id.to_string(), status);
        self.update_summary();
    }

    fn set_icon(&mut self, icon: IndicatorIcon) {
        let path = self.layout.icon_path(icon);
        if path.exists() {
            self.status_icon.set_from_file(Some(&path));
        } else {
            error!("Cannot find icon: {}", path.display());
        }
        self.status_icon.set_tooltip_text(Some(icon_tooltip(icon)));
    }
}
