use anyhow::Context;
use aws_config::BehaviorVersion;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;
use async_trait::async_trait;
use tracing::info;

/// Outbound mail seam. Production uses SES; when no sender address is
/// configured the `LogMailer` records the message instead so local runs work
/// without AWS credentials.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()>;
}

pub struct SesMailer {
    client: SesClient,
    from: String,
}

impl SesMailer {
    pub async fn new(from: &str) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self {
            client: SesClient::new(&shared),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> anyhow::Result<()> {
        let destination = Destination::builder().to_addresses(to).build();

        let subject_content = Content::builder()
            .data(subject)
            .charset("UTF-8")
            .build()
            .context("build ses subject")?;
        let body_content = Content::builder()
            .data(html_body)
            .charset("UTF-8")
            .build()
            .context("build ses body")?;

        let message = Message::builder()
            .subject(subject_content)
            .body(Body::builder().html(body_content).build())
            .build();

        let result = self
            .client
            .send_email()
            .from_email_address(&self.from)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .context("ses send_email")?;

        info!(to = %to, message_id = ?result.message_id(), "email sent");
        Ok(())
    }
}

/// Fallback used when `SES_FROM_EMAIL` is unset and in unit tests.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> anyhow::Result<()> {
        info!(to = %to, subject = %subject, "mailer not configured; email suppressed");
        Ok(())
    }
}

pub fn verification_email(link: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <h2>Confirm your email</h2>
  <p>Thanks for signing up with Homefix. Click the link below to verify your email address.</p>
  <p><a href="{link}">Verify your email</a></p>
  <p>If you did not create an account, you can ignore this message.</p>
</body>
</html>"#
    )
}

pub fn reset_email(link: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <h2>Reset your password</h2>
  <p>We received a request to reset your Homefix password. The link below is valid once and expires shortly.</p>
  <p><a href="{link}">Choose a new password</a></p>
  <p>If you did not request this, no action is needed.</p>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_embed_link() {
        let link = "https://app.example.com/verify?token=abc123";
        assert!(verification_email(link).contains(link));
        assert!(reset_email(link).contains(link));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        LogMailer
            .send("someone@example.com", "Hello", "<p>hi</p>")
            .await
            .expect("log mailer never fails");
    }
}
