//! Session-facing operations (§6): button presses, media control, app
//! launch, and event subscription, expressed as OPACK requests over an
//! already pair-verified [`Protocol`].
//!
//! Exact content field names below are this crate's best-effort
//! reproduction of what a genuine iOS client sends; §6 documents them as
//! "protocol-opaque" and this crate has no wire capture to check them
//! against, so treat the field names as reasonable placeholders rather
//! than a guarantee of interoperability with a real device.

use companion_opack::Value;
use companion_protocol::Protocol;
use companion_transport::FrameType;

use crate::error::Result;

/// An identifier this session API issues requests under (§6 "OPACK
/// envelope").
mod identifier {
    pub const SYSTEM_INFO: &str = "_systemInfo";
    pub const SESSION_START: &str = "_sessionStart";
    pub const SESSION_STOP: &str = "_sessionStop";
    pub const TOUCH_START: &str = "_touchStart";
    pub const TOUCH_STOP: &str = "_touchStop";
    pub const HID_COMMAND: &str = "_hidC";
    pub const MEDIA_CONTROL_COMMAND: &str = "_mcc";
    pub const LAUNCH_APP: &str = "_launchApp";
    pub const INTEREST: &str = "_interest";
    pub const FETCH_ATTENTION_STATE: &str = "FetchAttentionState";
    pub const FETCH_LAUNCHABLE_APPLICATIONS: &str = "FetchLaunchableApplicationsEvent";
}

/// A live, pair-verified Companion Protocol connection.
///
/// Cheap to clone: cloning shares the same underlying [`Protocol`] and
/// therefore the same transport task, so concurrent commands are legal
/// (§5 "Ordering guarantees" — OPACK requests may complete out of
/// submission order; only auth frames are strictly serial, and a
/// `Session` never issues those after `connect()` returns).
#[derive(Clone)]
pub struct Session {
    protocol: Protocol,
}

impl Session {
    pub(crate) fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }

    async fn request(&self, identifier: &str, content: Value) -> Result<Value> {
        Ok(self
            .protocol
            .request_opack(FrameType::EOpack, identifier, content)
            .await?)
    }

    /// Fetch the device's system info.
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn system_info(&self) -> Result<Value> {
        self.request(identifier::SYSTEM_INFO, Value::Map(Vec::new()))
            .await
    }

    /// Start a remote-control session, required before HID/touch/media
    /// commands are accepted.
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn session_start(&self) -> Result<()> {
        self.request(identifier::SESSION_START, Value::Map(Vec::new()))
            .await?;
        Ok(())
    }

    /// Stop the remote-control session started by [`Session::session_start`].
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn session_stop(&self) -> Result<()> {
        self.request(identifier::SESSION_STOP, Value::Map(Vec::new()))
            .await?;
        Ok(())
    }

    /// Begin a touch gesture at normalized coordinates `(x, y)`.
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn touch_start(&self, x: f32, y: f32) -> Result<()> {
        let content = Value::map([("x", Value::F32(x)), ("y", Value::F32(y))]);
        self.request(identifier::TOUCH_START, content).await?;
        Ok(())
    }

    /// End a touch gesture begun by [`Session::touch_start`].
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn touch_stop(&self, x: f32, y: f32) -> Result<()> {
        let content = Value::map([("x", Value::F32(x)), ("y", Value::F32(y))]);
        self.request(identifier::TOUCH_STOP, content).await?;
        Ok(())
    }

    /// Press a HID button, identified by its raw usage code. Building a
    /// friendly enum over these codes is out of scope (§1).
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn press_button(&self, hid_usage: u8) -> Result<()> {
        let content = Value::map([(identifier::HID_COMMAND, Value::Int(i64::from(hid_usage)))]);
        self.request(identifier::HID_COMMAND, content).await?;
        Ok(())
    }

    /// Issue a media control command, identified by its raw command code.
    /// Building a friendly enum over these codes is out of scope (§1).
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn media_command(&self, command_code: u8) -> Result<()> {
        let content = Value::map([(
            identifier::MEDIA_CONTROL_COMMAND,
            Value::Int(i64::from(command_code)),
        )]);
        self.request(identifier::MEDIA_CONTROL_COMMAND, content)
            .await?;
        Ok(())
    }

    /// Launch the app with the given bundle identifier.
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn launch_app(&self, bundle_id: &str) -> Result<()> {
        let content = Value::map([("_bundleID", Value::string(bundle_id))]);
        self.request(identifier::LAUNCH_APP, content).await?;
        Ok(())
    }

    /// Subscribe to (or, with `subscribe = false`, unsubscribe from) the
    /// named unsolicited events.
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn set_interest(&self, events: &[&str], subscribe: bool) -> Result<()> {
        let content = Value::map(events.iter().map(|name| (*name, Value::Bool(subscribe))));
        self.request(identifier::INTEREST, content).await?;
        Ok(())
    }

    /// Convenience wrapper over [`Session::set_interest`] for subscribing.
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn subscribe(&self, events: &[&str]) -> Result<()> {
        self.set_interest(events, true).await
    }

    /// Convenience wrapper over [`Session::set_interest`] for
    /// unsubscribing.
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn unsubscribe(&self, events: &[&str]) -> Result<()> {
        self.set_interest(events, false).await
    }

    /// Fetch the device's current attention (awake/asleep) state.
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn fetch_attention_state(&self) -> Result<Value> {
        self.request(identifier::FETCH_ATTENTION_STATE, Value::Map(Vec::new()))
            .await
    }

    /// Fetch the device's launchable applications.
    ///
    /// # Errors
    ///
    /// See [`crate::ClientError`].
    pub async fn fetch_launchable_applications(&self) -> Result<Value> {
        self.request(
            identifier::FETCH_LAUNCHABLE_APPLICATIONS,
            Value::Map(Vec::new()),
        )
        .await
    }
}
