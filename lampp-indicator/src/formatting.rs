use gtk4::gdk;
use humantime::format_duration;
use lampp_core::{IndicatorIcon, Layout, ServiceStatus};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusLevel {
    Good,
    Neutral,
    Warning,
}

pub fn status_level(status: ServiceStatus) -> StatusLevel {
    match status {
        ServiceStatus::Running => StatusLevel::Good,
        ServiceStatus::Stopped => StatusLevel::Neutral,
        ServiceStatus::Unknown => StatusLevel::Warning,
    }
}

pub fn status_indicator_color(level: StatusLevel) -> gdk::RGBA {
    match level {
        StatusLevel::Good => gdk::RGBA::new(0.18, 0.74, 0.33, 1.0),
        StatusLevel::Neutral => gdk::RGBA::new(0.58, 0.6, 0.65, 1.0),
        StatusLevel::Warning => gdk::RGBA::new(0.96, 0.62, 0.04, 1.0),
    }
}

pub fn service_tooltip(label: &str, status: ServiceStatus) -> String {
    match status {
        ServiceStatus::Running => format!("{label} is running; click to stop it"),
        ServiceStatus::Stopped => format!("{label} is not running; click to start it"),
        ServiceStatus::Unknown => format!("{label} status is unknown; click to start it"),
    }
}

pub fn icon_tooltip(icon: IndicatorIcon) -> &'static str {
    match icon {
        IndicatorIcon::Active => "LAMPP is running",
        IndicatorIcon::Inactive => "LAMPP is stopped",
    }
}

pub fn summary_text(running: usize, total: usize) -> String {
    format!("{running} of {total} services running")
}

pub fn about_comments(layout: &Layout) -> String {
    format!(
        "Start, stop and monitor the LAMPP stack installed in {}.\nStatus is re-checked {} after every action.",
        layout.root().display(),
        format_duration(layout.refresh_delay())
    )
}
