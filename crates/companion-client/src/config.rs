//! Connection parameters the caller supplies; there is no config-file
//! layer (§6: host/port/PIN are all caller-provided).

/// Parameters for a single connection attempt.
///
/// `host`/`port` are normally learned from mDNS discovery (an external
/// collaborator per §1); this type only carries what the transport and
/// pairing layers need once a device has been chosen. The multiplexer's
/// per-request timeout is a crate-wide constant
/// ([`companion_protocol::DEFAULT_TIMEOUT`]) rather than a field here,
/// since nothing downstream of `Protocol::spawn` threads a per-session
/// override through.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Device hostname or IP address.
    pub host: String,
    /// TCP port the Companion service listens on.
    pub port: u16,
    /// Name sent to the device during Pair-Setup M5 (`{name: <display>}`),
    /// shown to the user as "paired with ...".
    pub display_name: String,
    /// Whether to verify the device's optional M5/M6 accessory signature
    /// during Pair-Setup (§9: the upstream source does not; this spec
    /// allows but does not require it).
    pub verify_device_signature: bool,
}

impl SessionConfig {
    /// Build a config with the given host/port and the other fields at
    /// their defaults.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            display_name: "companion-client".to_string(),
            verify_device_signature: false,
        }
    }
}
