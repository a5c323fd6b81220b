/// Service whose state gates stack-wide start, stop and restart.
pub const MASTER_SERVICE: &str = "APACHE";

/// A managed service of the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    id: &'static str,
    label: &'static str,
    process_signature: &'static str,
    command_fragment: &'static str,
}

impl Service {
    const fn new(
        id: &'static str,
        label: &'static str,
        process_signature: &'static str,
        command_fragment: &'static str,
    ) -> Self {
        Service {
            id,
            label,
            process_signature,
            command_fragment,
        }
    }

    /// Key used by `lampp statusraw`.
    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Command name as it appears in the process table.
    pub fn process_signature(&self) -> &'static str {
        self.process_signature
    }

    /// Suffix appended to `start`/`stop`/`reload`, e.g. `startftp`.
    pub fn command_fragment(&self) -> &'static str {
        self.command_fragment
    }
}

/// Ordered, immutable catalog of managed services.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    services: Vec<Service>,
    master: usize,
}

impl ServiceRegistry {
    /// The services bundled with a LAMPP installation, in menu order.
    pub fn lampp() -> Self {
        let services = vec![
            Service::new("APACHE", "Apache", "httpd", "apache"),
            Service::new("MYSQL", "MySQL", "mysqld", "mysql"),
            Service::new("PROFTPD", "FTP", "proftpd", "ftp"),
        ];
        let master = services
            .iter()
            .position(|service| service.id == MASTER_SERVICE)
            .unwrap_or_default();
        ServiceRegistry { services, master }
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn get(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.id == id)
    }

    pub fn master(&self) -> &Service {
        &self.services[self.master]
    }

    pub fn master_id(&self) -> &'static str {
        self.master().id
    }
}
