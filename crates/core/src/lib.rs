//! # GP Update Core
//!
//! Composes ITK3 "update record" messages from a JSON request.
//!
//! This crate contains the pure composition pipeline:
//! - request parsing and minimal validation
//! - primary-encounter resolution
//! - one builder per FHIR resource kind
//! - bundle assembly with a reference-integrity check
//!
//! It reads no environment variables and does no I/O. Configuration arrives as a
//! [`CoreConfig`] resolved at startup.
//!
//! **No API concerns**: HTTP routing, idempotency and delivery belong in `api-rest`.
//!
//! ## Example
//!
//! ```no_run
//! use gpupdate_core::{Composer, CoreConfig};
//!
//! let composer = Composer::new(CoreConfig::default());
//! let body = std::fs::read("request.json").unwrap();
//! let message = composer.compose_json(&body).unwrap();
//! let xml = message.to_xml().unwrap();
//! ```

pub mod assembler;
pub mod builders;
pub mod config;
pub mod constants;
pub mod encounters;
pub mod error;
pub mod request;
pub mod validation;

pub use assembler::{ComposedMessage, Role};
pub use config::{CoreConfig, EnvValues};
pub use error::{ComposeError, ComposeResult, ErrorKind};
pub use request::UpdateRecordRequest;
pub use validation::RequiredFields;

use chrono::{DateTime, Utc};
use gpupdate_uuid::{RandomUuids, ReferenceAllocator, UuidSource};

/// Entry point for composing messages.
///
/// Holds only immutable configuration, so one instance can be shared across concurrent
/// requests.
#[derive(Clone, Debug, Default)]
pub struct Composer {
    config: CoreConfig,
}

impl Composer {
    pub fn new(config: CoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Run the minimal validation and attachment checks without building anything.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::Validation`] or [`ComposeError::Construction`].
    pub fn validate(&self, req: &UpdateRecordRequest) -> ComposeResult<RequiredFields> {
        let required = validation::validate_minimal(req)?;
        validation::check_xml_text(req)?;
        builders::check_attachments(req.attachments.as_deref().unwrap_or_default())?;
        Ok(required)
    }

    /// Compose a message with fresh random identities and the current time.
    ///
    /// # Errors
    ///
    /// See [`Composer::compose_with`].
    pub fn compose(&self, req: &UpdateRecordRequest) -> ComposeResult<ComposedMessage> {
        self.compose_with(req, RandomUuids, Utc::now())
    }

    /// Compose a message drawing identities from `source` and stamping every timestamp with
    /// `now`.
    ///
    /// # Errors
    ///
    /// - [`ComposeError::Validation`] when a required field group is incomplete
    /// - [`ComposeError::Construction`] when an observation, medication or attachment breaks a
    ///   construction rule
    /// - [`ComposeError::DanglingReferences`] if assembly produced an unresolved reference
    pub fn compose_with<S: UuidSource>(
        &self,
        req: &UpdateRecordRequest,
        source: S,
        now: DateTime<Utc>,
    ) -> ComposeResult<ComposedMessage> {
        let required = self.validate(req)?;
        let message = assembler::assemble(
            req,
            &required,
            &self.config,
            ReferenceAllocator::with_source(source),
            now,
        )?;

        tracing::debug!(
            message_id = %message.message_id(),
            entries = message.bundle().entry.len(),
            "composed update-record message"
        );
        Ok(message)
    }

    /// Parse a JSON request body and compose it.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidJson`] if the body is not a valid request, otherwise as
    /// [`Composer::compose`].
    pub fn compose_json(&self, body: &[u8]) -> ComposeResult<ComposedMessage> {
        let req = UpdateRecordRequest::from_json_slice(body)?;
        self.compose(&req)
    }
}
