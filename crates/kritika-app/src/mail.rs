use std::sync::{Arc, Mutex};

use tracing::info;

/// Message handed to the outbound transport.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub sender: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("Mail transport error: {0}")]
pub struct MailError(pub String);

pub type Outbox = Arc<Mutex<Vec<OutgoingMail>>>;

/// Outbound mail transport. Real delivery is a deployment concern, the
/// contract here is that a failed send surfaces as an error instead of being
/// swallowed - signup has no other channel to hand out the confirmation code.
#[derive(Clone)]
pub enum Mailer {
    /// Writes messages to the log, for development setups.
    Log,
    /// Collects messages in memory, for tests.
    Memory(Outbox),
    /// Refuses every message, for exercising delivery failures.
    Refusing,
}

impl Mailer {
    pub fn memory() -> (Self, Outbox) {
        let outbox = Outbox::default();
        (Mailer::Memory(outbox.clone()), outbox)
    }

    pub async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        match self {
            Mailer::Log => {
                info!(
                    "Mail to {}: {} / {}",
                    mail.recipients.join(", "),
                    mail.subject,
                    mail.body
                );
                Ok(())
            }
            Mailer::Memory(outbox) => {
                outbox
                    .lock()
                    .map_err(|_| MailError("Outbox poisoned".to_string()))?
                    .push(mail);
                Ok(())
            }
            Mailer::Refusing => Err(MailError("Transport refused message".to_string())),
        }
    }
}
