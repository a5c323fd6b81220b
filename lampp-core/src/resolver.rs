//! Turns raw probe output into a [`StatusSnapshot`].
use crate::probe::ProcessProbe;
use crate::registry::ServiceRegistry;
use crate::{ServiceStatus, StatusSnapshot};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static STATUS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?P<key>[A-Za-z0-9_]+)\s+(?P<token>\S+)").unwrap());

/// Parse a `statusraw` report. The first line is a header and is skipped.
pub fn parse_status_report(output: &str) -> Vec<(&str, ServiceStatus)> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| STATUS_LINE.captures(line))
        .filter_map(|caps| {
            let key = caps.name("key")?.as_str();
            let token = caps.name("token")?.as_str();
            Some((key, ServiceStatus::from_token(token)))
        })
        .collect()
}

/// Command names from a process table.
///
/// Only the last whitespace-delimited token of each row is used, since the
/// number of leading columns differs between platforms. Paths are reduced to
/// their file name.
pub fn process_names(output: &str) -> HashSet<&str> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .map(|token| token.rsplit('/').next().unwrap_or(token))
        .filter(|name| !name.is_empty())
        .collect()
}

#[derive(Debug, Clone)]
pub struct StatusResolver<P> {
    probe: P,
}

impl<P: ProcessProbe> StatusResolver<P> {
    pub fn new(probe: P) -> Self {
        StatusResolver { probe }
    }

    /// Run both probes and merge them. Never fails: anything unresolved stays
    /// `Unknown`.
    pub fn resolve(&self, registry: &ServiceRegistry) -> StatusSnapshot {
        let mut snapshot = StatusSnapshot::unknown(registry);

        match self.probe.status_query() {
            Ok(output) => {
                for (key, status) in parse_status_report(&output) {
                    snapshot.set(key, status);
                }
            }
            Err(err) => warn!("{err}"),
        }

        // The status report is only reliable for the master service when not
        // elevated, so a live process always wins.
        match self.probe.process_list() {
            Ok(output) => {
                let names = process_names(&output);
                for service in registry.services() {
                    if names.contains(service.process_signature()) {
                        snapshot.set(service.id(), ServiceStatus::Running);
                    }
                }
            }
            Err(err) => warn!("{err}"),
        }

        for (id, status) in snapshot.iter() {
            info!("{id} {status}");
        }
        info!("{}", "-".repeat(24));

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::{StatusResolver, parse_status_report, process_names};
    use crate::testing::FakeProbe;
    use crate::{ServiceRegistry, ServiceStatus};

    const PS_OUTPUT: &str = "    PID TTY          TIME CMD
      1 ?        00:00:02 systemd
    812 ?        00:00:00 httpd
    997 ?        00:00:01 /opt/lampp/sbin/mysqld
   1203 pts/0    00:00:00 bash
";

    #[test]
    fn skips_header_and_unparseable_lines() {
        let report = "XAMPP: status\nAPACHE RUNNING\n\ngarbage\nPROFTPD DEACTIVATED\n";
        assert_eq!(
            parse_status_report(report),
            vec![
                ("APACHE", ServiceStatus::Running),
                ("PROFTPD", ServiceStatus::Stopped),
            ]
        );
        assert!(parse_status_report("APACHE RUNNING").is_empty());
    }

    #[test]
    fn extracts_trailing_command_names() {
        let names = process_names(PS_OUTPUT);
        assert!(names.contains("httpd"));
        assert!(names.contains("mysqld"));
        assert!(names.contains("CMD"));
        assert!(!names.contains("00:00:00"));
        assert!(process_names("").is_empty());
    }

    #[test]
    fn process_table_overrides_status_report() {
        let probe = FakeProbe::new(
            Some("header\nAPACHE RUNNING\nMYSQL NOTRUNNING\n"),
            Some("PID CMD\n42 mysqld\n"),
        );
        let snapshot = StatusResolver::new(probe).resolve(&ServiceRegistry::lampp());
        assert_eq!(snapshot.status("APACHE"), ServiceStatus::Running);
        assert_eq!(snapshot.status("MYSQL"), ServiceStatus::Running);
        assert_eq!(snapshot.status("PROFTPD"), ServiceStatus::Unknown);
    }

    #[test]
    fn unmatched_services_stay_unknown() {
        let probe = FakeProbe::new(Some("header\nNGINX RUNNING\n"), Some(PS_OUTPUT));
        let snapshot = StatusResolver::new(probe).resolve(&ServiceRegistry::lampp());
        assert_eq!(snapshot.status("APACHE"), ServiceStatus::Running);
        assert_eq!(snapshot.status("MYSQL"), ServiceStatus::Running);
        assert_eq!(snapshot.status("PROFTPD"), ServiceStatus::Unknown);
        assert_eq!(snapshot.iter().count(), 3);
    }

    #[test]
    fn stopped_report_survives_without_process() {
        let probe = FakeProbe::new(Some("header\nPROFTPD NOTRUNNING\n"), Some(""));
        let snapshot = StatusResolver::new(probe).resolve(&ServiceRegistry::lampp());
        assert_eq!(snapshot.status("PROFTPD"), ServiceStatus::Stopped);
        assert_eq!(snapshot.status("APACHE"), ServiceStatus::Unknown);
    }

    #[test]
    fn unavailable_probes_degrade_to_unknown() {
        let probe = FakeProbe::new(None, None);
        let snapshot = StatusResolver::new(probe).resolve(&ServiceRegistry::lampp());
        assert!(snapshot.iter().all(|(_, status)| status == ServiceStatus::Unknown));

        let probe = FakeProbe::new(None, Some("1 proftpd\n"));
        let snapshot = StatusResolver::new(probe).resolve(&ServiceRegistry::lampp());
        assert_eq!(snapshot.status("PROFTPD"), ServiceStatus::Running);
        assert_eq!(snapshot.status("APACHE"), ServiceStatus::Unknown);
    }
}
