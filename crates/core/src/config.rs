//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the [`crate::Composer`].
//! The composer never reads process-wide environment variables while handling a request.
//!
//! The `*_from_env_value` helpers take the raw `Option<String>` from `std::env::var(..).ok()` so
//! they can be tested without touching the process environment.

use crate::constants::{DEFAULT_RECIPIENT_TYPE, DEFAULT_SENDER_MESH_MAILBOX, DEFAULT_SENDER_ODS};
use crate::{ComposeError, ComposeResult};

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    sender_mesh_mailbox: String,
    default_sender_ods: String,
    default_business_ack_requested: bool,
    default_infrastructure_ack_requested: bool,
    default_recipient_type: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if the mailbox, fallback ODS code or recipient
    /// type is blank.
    pub fn new(
        sender_mesh_mailbox: String,
        default_sender_ods: String,
        default_business_ack_requested: bool,
        default_infrastructure_ack_requested: bool,
        default_recipient_type: String,
    ) -> ComposeResult<Self> {
        for (name, value) in [
            ("sender_mesh_mailbox", &sender_mesh_mailbox),
            ("default_sender_ods", &default_sender_ods),
            ("default_recipient_type", &default_recipient_type),
        ] {
            if value.trim().is_empty() {
                return Err(ComposeError::InvalidConfig(format!("{name} cannot be empty")));
            }
        }

        Ok(Self {
            sender_mesh_mailbox: sender_mesh_mailbox.trim().to_owned(),
            default_sender_ods: default_sender_ods.trim().to_owned(),
            default_business_ack_requested,
            default_infrastructure_ack_requested,
            default_recipient_type: default_recipient_type.trim().to_owned(),
        })
    }

    /// MESH mailbox written to `MessageHeader.source.endpoint`.
    pub fn sender_mesh_mailbox(&self) -> &str {
        &self.sender_mesh_mailbox
    }

    /// ODS code used for the organisations when no encounter supplies one.
    pub fn default_sender_ods(&self) -> &str {
        &self.default_sender_ods
    }

    pub fn default_business_ack_requested(&self) -> bool {
        self.default_business_ack_requested
    }

    pub fn default_infrastructure_ack_requested(&self) -> bool {
        self.default_infrastructure_ack_requested
    }

    pub fn default_recipient_type(&self) -> &str {
        &self.default_recipient_type
    }

    /// Returns a copy with a different sender mailbox.
    pub fn with_sender_mesh_mailbox(mut self, mailbox: impl Into<String>) -> ComposeResult<Self> {
        let mailbox = mailbox.into();
        if mailbox.trim().is_empty() {
            return Err(ComposeError::InvalidConfig(
                "sender_mesh_mailbox cannot be empty".into(),
            ));
        }
        self.sender_mesh_mailbox = mailbox.trim().to_owned();
        Ok(self)
    }

    /// Returns a copy with a different fallback sender ODS code.
    pub fn with_default_sender_ods(mut self, ods: impl Into<String>) -> ComposeResult<Self> {
        let ods = ods.into();
        if ods.trim().is_empty() {
            return Err(ComposeError::InvalidConfig(
                "default_sender_ods cannot be empty".into(),
            ));
        }
        self.default_sender_ods = ods.trim().to_owned();
        Ok(self)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            sender_mesh_mailbox: DEFAULT_SENDER_MESH_MAILBOX.to_owned(),
            default_sender_ods: DEFAULT_SENDER_ODS.to_owned(),
            default_business_ack_requested: true,
            default_infrastructure_ack_requested: true,
            default_recipient_type: DEFAULT_RECIPIENT_TYPE.to_owned(),
        }
    }
}

/// Raw values of the composer's environment variables, as read at startup.
#[derive(Clone, Debug, Default)]
pub struct EnvValues {
    pub sender_mesh_mailbox: Option<String>,
    pub default_sender_ods: Option<String>,
    pub default_business_ack_requested: Option<String>,
    pub default_infrastructure_ack_requested: Option<String>,
    pub default_recipient_type: Option<String>,
}

impl CoreConfig {
    /// Resolve configuration from raw environment values, applying defaults for unset or blank
    /// entries.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidConfig`] if a boolean flag cannot be parsed.
    pub fn from_env_values(values: EnvValues) -> ComposeResult<Self> {
        Self::new(
            string_from_env_value(values.sender_mesh_mailbox, DEFAULT_SENDER_MESH_MAILBOX),
            string_from_env_value(values.default_sender_ods, DEFAULT_SENDER_ODS),
            bool_from_env_value(
                "DEFAULT_BUSINESS_ACK_REQUESTED",
                values.default_business_ack_requested,
                true,
            )?,
            bool_from_env_value(
                "DEFAULT_INFRASTRUCTURE_ACK_REQUESTED",
                values.default_infrastructure_ack_requested,
                true,
            )?,
            string_from_env_value(values.default_recipient_type, DEFAULT_RECIPIENT_TYPE),
        )
    }
}

/// Trimmed value, or `default` when unset or blank.
pub fn string_from_env_value(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

/// Parse a boolean flag.
///
/// Accepts `true/false`, `1/0` and `yes/no` in any case. Unset or blank values yield `default`.
pub fn bool_from_env_value(name: &str, value: Option<String>, default: bool) -> ComposeResult<bool> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ComposeError::InvalidConfig(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}
