use async_trait::async_trait;
use std::sync::Mutex;

/// Abstract transactional-mail collaborator. The real provider is an
/// external system out of scope here; this trait is the seam a production
/// deployment would fill with a concrete client.
#[async_trait]
pub trait MailSenderT: Send + Sync {
    async fn send_verification_code(&self, email: &str, code: &str);
    async fn send_reset_code(&self, email: &str, code: &str);
}

/// Default implementation: logs instead of delivering. Adequate for a
/// deployment that doesn't yet have a provider wired in.
pub struct LoggingMailSender;

#[async_trait]
impl MailSenderT for LoggingMailSender {
    async fn send_verification_code(&self, email: &str, code: &str) {
        tracing::info!(email, code, "verification code issued");
    }

    async fn send_reset_code(&self, email: &str, code: &str) {
        tracing::info!(email, code, "password reset code issued");
    }
}

/// Test double recording the last code sent per email, so integration
/// tests can drive the verification/reset flows deterministically.
#[derive(Default)]
pub struct RecordingMailSender {
    last_code: Mutex<Option<(String, String)>>,
}

#[async_trait]
impl MailSenderT for RecordingMailSender {
    async fn send_verification_code(&self, email: &str, code: &str) {
        *self.last_code.lock().unwrap() = Some((email.to_string(), code.to_string()));
    }

    async fn send_reset_code(&self, email: &str, code: &str) {
        *self.last_code.lock().unwrap() = Some((email.to_string(), code.to_string()));
    }
}

impl RecordingMailSender {
    pub fn last_code(&self) -> Option<(String, String)> {
        self.last_code.lock().unwrap().clone()
    }
}
