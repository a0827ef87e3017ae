use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_sesv2::{
    config::{Builder as SesConfigBuilder, Region},
    types::{Body, Content, Destination, EmailContent, Message},
    Client,
};

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Sends through Amazon SES v2.
#[derive(Clone)]
pub struct SesMailer {
    client: Client,
    from: String,
}

impl SesMailer {
    pub async fn new(cfg: &MailConfig, from: &str) -> anyhow::Result<Self> {
        let mut loader = defaults(BehaviorVersion::latest()).region(Region::new(cfg.region.clone()));
        if let (Some(access_key), Some(secret_key)) = (&cfg.access_key, &cfg.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key.as_str(),
                secret_key.as_str(),
                None,
                None,
                "static",
            ));
        }
        if let Some(endpoint) = &cfg.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let conf = SesConfigBuilder::from(&shared).build();
        Ok(Self {
            client: Client::from_conf(conf),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        let subject = Content::builder()
            .data(email.subject)
            .charset("UTF-8")
            .build()
            .context("build subject")?;
        let html = Content::builder()
            .data(email.html)
            .charset("UTF-8")
            .build()
            .context("build body")?;
        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().html(html).build())
            .build();

        let out = self
            .client
            .send_email()
            .from_email_address(&self.from)
            .destination(Destination::builder().to_addresses(&email.to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .context("ses send_email")?;
        tracing::info!(to = %email.to, message_id = ?out.message_id(), "email sent");
        Ok(())
    }
}

/// Logs outgoing mail instead of delivering it. Used when `MAIL_FROM` is not set.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        // The body carries live verification and reset links; keep it out of info logs.
        tracing::info!(to = %email.to, subject = %email.subject, "email not sent (no MAIL_FROM configured)");
        tracing::debug!(to = %email.to, body = %email.html, "unsent email body");
        Ok(())
    }
}

pub fn verification_email(to: &str, frontend_url: &str, token: &str) -> Email {
    let url = format!("{frontend_url}/verify/{token}");
    Email {
        to: to.to_string(),
        subject: "Email Verification".into(),
        html: format!(
            "<h1>Verify your Email</h1>\
             <p>Thank you for registering. Please click the link below to verify your account:</p>\
             <a href=\"{url}\" clicktracking=off>{url}</a>"
        ),
    }
}

pub fn password_reset_email(to: &str, frontend_url: &str, token: &str) -> Email {
    let url = format!("{frontend_url}/reset-password/{token}");
    Email {
        to: to.to_string(),
        subject: "Password Reset Request".into(),
        html: format!(
            "<h1>Password Reset</h1><p>Click <a href=\"{url}\">here</a> to reset your password.</p>"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_links_to_frontend() {
        let email = verification_email("a@x.com", "https://lms.example", "abc123");
        assert_eq!(email.to, "a@x.com");
        assert_eq!(email.subject, "Email Verification");
        assert!(email.html.contains("https://lms.example/verify/abc123"));
    }

    #[test]
    fn reset_email_links_to_frontend() {
        let email = password_reset_email("a@x.com", "https://lms.example", "tok");
        assert!(email.html.contains("https://lms.example/reset-password/tok"));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn log_mailer_keeps_tokens_out_of_info_logs() {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let email = verification_email("a@x.com", "http://localhost", "secret-token-123");
        LogMailer.send(email).await.expect("log mailer");

        let logged = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("a@x.com"));
        assert!(logged.contains("Email Verification"));
        assert!(!logged.contains("secret-token-123"));
    }
}
