/// Caller-facing handle for one authenticated connection.
///
/// The transport sink itself is not stored here — it is threaded through as
/// a `&dyn Transport` by the dispatcher — so `Session` stays plain data and
/// is cheap to clone into the `tracing` spans that wrap a dispatch.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: String,
    pub ip_address: String,
    pub hostname: Option<String>,
    /// Negotiated protocol version: 1, or >= 2.
    pub protocol: u32,
}

impl Session {
    pub fn new(user: impl Into<String>, ip_address: impl Into<String>, protocol: u32) -> Self {
        Session {
            user: user.into(),
            ip_address: ip_address.into(),
            hostname: None,
            protocol,
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn is_v1(&self) -> bool {
        self.protocol == 1
    }
}
