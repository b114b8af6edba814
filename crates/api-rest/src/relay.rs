//! Hand-off of composed messages to the outbound relay.

/// Failure to hand a message to the relay.
#[derive(Debug, thiserror::Error)]
#[error("relay hand-off failed for message {message_id}: {reason}")]
pub struct RelayError {
    pub message_id: String,
    pub reason: String,
}

/// Receives every successfully composed message before the response is sent.
pub trait MessageRelay: Send + Sync {
    fn hand_off(&self, message_id: &str, xml: &[u8]) -> Result<(), RelayError>;
}

/// Records the hand-off in the log and does not transmit anything.
#[derive(Clone, Debug)]
pub struct LoggingRelay {
    mailbox: String,
}

impl LoggingRelay {
    pub fn new(mailbox: impl Into<String>) -> Self {
        Self {
            mailbox: mailbox.into(),
        }
    }
}

impl MessageRelay for LoggingRelay {
    fn hand_off(&self, message_id: &str, xml: &[u8]) -> Result<(), RelayError> {
        tracing::info!(
            message_id,
            mailbox = %self.mailbox,
            bytes = xml.len(),
            "message ready for relay"
        );
        Ok(())
    }
}
