use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use geopub_core::config::EmailConfig;

use crate::error::{HarvestError, Result};

/// Outbound notification channel. The harvest loop records every attempt
/// in the e-mail log regardless of delivery outcome.
pub trait Notifier {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Delivers over SMTP with the credentials from the e-mail config. The
/// password comes from the environment, never from the config file.
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| HarvestError::Notify(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| HarvestError::Notify(format!("invalid recipient: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| HarvestError::Notify(e.to_string()))?;

        let password = std::env::var(&self.config.password_env).unwrap_or_default();
        let credentials = Credentials::new(self.config.username.clone(), password);

        let relay = if self.config.use_starttls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
        } else {
            SmtpTransport::relay(&self.config.smtp_host)
        }
        .map_err(|e| HarvestError::Notify(e.to_string()))?;

        let mailer = relay
            .port(self.config.smtp_port)
            .credentials(credentials)
            .build();

        mailer
            .send(&message)
            .map_err(|e| HarvestError::Notify(e.to_string()))?;
        Ok(())
    }
}

/// Used when e-mail is disabled in the config.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn send(&self, to: &str, subject: &str, _body: &str) -> Result<()> {
        tracing::debug!("e-mail disabled, dropping \"{subject}\" to {to}");
        Ok(())
    }
}

pub fn notifier_from_config(config: &EmailConfig) -> Box<dyn Notifier> {
    if config.enabled {
        Box::new(SmtpNotifier::new(config.clone()))
    } else {
        Box::new(NoopNotifier)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Captures sends, optionally failing them, for harvest-loop tests.
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String, String)>>,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
            self.sent.lock().unwrap().push((
                to.to_string(),
                subject.to_string(),
                body.to_string(),
            ));
            if self.fail {
                return Err(HarvestError::Notify("smtp unavailable".to_string()));
            }
            Ok(())
        }
    }
}
