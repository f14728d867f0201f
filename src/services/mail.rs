use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for the outbound mail relay.
#[derive(Deserialize)]
pub struct MailConfig {
    // non-secrets
    mail_relay_url: String,
    mail_from: String,
    // secrets
    mail_relay_key: String,
}

/// A single outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl Mail {
    /// The message carrying freshly issued organization credentials.
    pub fn organization_credentials(email: &str, password: &str) -> Self {
        Self {
            to: email.to_string(),
            subject: "Your Organization Account Credentials".to_string(),
            html: format!(
                "<h2>Your Organization Credentials</h2>\
                 <p>Email: {email}</p>\
                 <p>Password: {password}</p>\
                 <p>Please log in using the above credentials and change your password immediately.</p>"
            ),
        }
    }

    /// The message telling an organization its account can now be used.
    pub fn organization_activated(name: &str, email: &str) -> Self {
        Self {
            to: email.to_string(),
            subject: "Your Organization Account Is Active".to_string(),
            html: format!(
                "<h2>Welcome, {name}!</h2>\
                 <p>Your organization account ({email}) has been activated.</p>\
                 <p>You can now log in and start creating elections.</p>"
            ),
        }
    }
}

/// Wire format expected by the relay.
#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    #[serde(flatten)]
    mail: &'a Mail,
}

/// Hands emails off to an HTTP mail relay.
#[cfg_attr(test, allow(dead_code))]
pub struct Mailer {
    http: HttpClient,
    config: MailConfig,
    #[cfg(test)]
    outbox: std::sync::Mutex<Vec<Mail>>,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            http: HttpClient::new(),
            config,
            #[cfg(test)]
            outbox: Default::default(),
        }
    }

    /// Deliver a message through the relay.
    #[cfg(not(test))]
    pub async fn send(&self, mail: Mail) -> Result<()> {
        let message = RelayMessage {
            from: &self.config.mail_from,
            mail: &mail,
        };
        self.http
            .post(&self.config.mail_relay_url)
            .bearer_auth(&self.config.mail_relay_key)
            .json(&message)
            .send()
            .await?
            .error_for_status()?;
        info!("Sent \"{}\" to {}", mail.subject, mail.to);
        Ok(())
    }

    /// In test mode, record the message instead of sending it.
    #[cfg(test)]
    pub async fn send(&self, mail: Mail) -> Result<()> {
        debug!("Recording \"{}\" to {}", mail.subject, mail.to);
        self.outbox.lock().unwrap().push(mail);
        Ok(())
    }

    /// Messages recorded so far.
    #[cfg(test)]
    pub fn sent(&self) -> Vec<Mail> {
        self.outbox.lock().unwrap().clone()
    }
}
