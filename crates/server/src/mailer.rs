use anyhow::Context;
use async_trait::async_trait;
use server_api::{Mailer, OutgoingMail};
use tracing::debug;

use crate::config::MailgunSettings;

pub const MAILGUN_API_BASE: &str = "https://api.mailgun.net";

/// Sends mails through the Mailgun HTTP API.
pub struct MailgunMailer {
    http: reqwest::Client,
    base_url: String,
    settings: MailgunSettings,
}

impl MailgunMailer {
    pub fn new(settings: MailgunSettings) -> Self {
        Self::with_base_url(settings, MAILGUN_API_BASE)
    }

    pub fn with_base_url(settings: MailgunSettings, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings,
        }
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let url = format!("{}/v3/{}/messages", self.base_url, self.settings.domain);
        debug!(%url, to = %mail.to, "posting mail to mailgun");
        self.http
            .post(&url)
            .basic_auth("api", Some(&self.settings.api_key))
            .form(&[
                ("from", self.settings.from.as_str()),
                ("to", mail.to.as_str()),
                ("subject", mail.subject.as_str()),
                ("text", mail.body.as_str()),
            ])
            .send()
            .await
            .context("mailgun request failed")?
            .error_for_status()
            .context("mailgun rejected the mail")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/mailer_tests.rs"]
mod tests;
