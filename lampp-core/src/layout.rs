//! Installation layout and runtime settings.
//!
//! Nothing is read from a config file; every setting has a default that can be
//! overridden through the environment.
use crate::controller::IndicatorIcon;
use crate::{CoreError, Result};
use log::warn;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LAMPP_ROOT: &str = "/opt/lampp";
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_ADMIN_URL: &str = "http://localhost/dashboard/";

const MANAGER_CANDIDATES: [&str; 2] = ["manager-linux-x64.run", "manager-linux.run"];

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    use_pkexec: bool,
    refresh_delay: Duration,
    admin_url: String,
    icon_dir: Option<PathBuf>,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            root: PathBuf::from(DEFAULT_LAMPP_ROOT),
            use_pkexec: true,
            refresh_delay: DEFAULT_REFRESH_DELAY,
            admin_url: DEFAULT_ADMIN_URL.to_string(),
            icon_dir: None,
        }
    }
}

impl Layout {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a layout from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layout = Layout::default();

        if let Some(root) = lookup("LAMPP_ROOT").filter(|value| !value.is_empty()) {
            layout.root = PathBuf::from(root);
        }
        layout.use_pkexec = lookup("LAMPP_INDICATOR_NO_PKEXEC")
            .map(|value| value == "0" || value.eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        if let Some(value) = lookup("LAMPP_INDICATOR_REFRESH_DELAY") {
            match parse_delay(&value) {
                Ok(delay) => layout.refresh_delay = delay,
                Err(err) => warn!("{err}; using {}", humantime::format_duration(DEFAULT_REFRESH_DELAY)),
            }
        }
        if let Some(url) = lookup("LAMPP_INDICATOR_ADMIN_URL").filter(|value| !value.is_empty()) {
            layout.admin_url = url;
        }
        layout.icon_dir = lookup("LAMPP_INDICATOR_ICON_DIR")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        layout
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_pkexec(mut self, use_pkexec: bool) -> Self {
        self.use_pkexec = use_pkexec;
        self
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn use_pkexec(&self) -> bool {
        self.use_pkexec
    }

    pub fn refresh_delay(&self) -> Duration {
        self.refresh_delay
    }

    pub fn admin_url(&self) -> &str {
        &self.admin_url
    }

    /// The `lampp` control script.
    pub fn control_binary(&self) -> PathBuf {
        self.root.join("lampp")
    }

    /// First manager GUI binary that exists on disk.
    pub fn manager_binary(&self) -> Result<PathBuf> {
        let candidates: Vec<PathBuf> = MANAGER_CANDIDATES
            .iter()
            .map(|name| self.root.join(name))
            .collect();
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Ok(path.clone()),
            None => Err(CoreError::MissingAsset(candidates[candidates.len() - 1].clone())),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("etc").join("httpd.conf")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("htdocs")
    }

    /// Icons live next to the executable unless overridden.
    pub fn icon_dir(&self) -> PathBuf {
        if let Some(dir) = &self.icon_dir {
            return dir.clone();
        }
        env::current_exe()
            .ok()
            .and_then(|exe| exe.canonicalize().ok())
            .and_then(|exe| exe.parent().map(|parent| parent.join("icons")))
            .unwrap_or_else(|| PathBuf::from("icons"))
    }

    pub fn icon_path(&self, icon: IndicatorIcon) -> PathBuf {
        self.icon_dir().join(icon.file_name())
    }
}

fn parse_delay(value: &str) -> Result<Duration> {
    let trimmed = value.trim();
    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }
    humantime::parse_duration(trimmed).map_err(|err| CoreError::InvalidSetting {
        name: "LAMPP_INDICATOR_REFRESH_DELAY",
        value: value.to_string(),
        message: err.to_string(),
    })
}
