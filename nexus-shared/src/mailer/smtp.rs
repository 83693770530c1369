//! SMTP delivery with `lettre`

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{EmailTemplates, Mailer, MailerError, OutgoingEmail};

/// SMTP connection settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    templates: EmailTemplates,
}

impl SmtpMailer {
    /// Builds the transport and parses the templates
    ///
    /// No connection is opened until the first send.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailerError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| MailerError::Transport(e.to_string()))?
            .port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox(&config.from)?,
            templates: EmailTemplates::load()?,
        })
    }

    async fn deliver(&self, email: OutgoingEmail) -> Result<(), MailerError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&email.to)?)
            .subject(&email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)
            .map_err(|e| MailerError::Message(e.to_string()))?;

        self.transport.send(message).await.map_err(|e| {
            tracing::error!(kind = ?email.kind, error = %e, "email delivery failed");
            MailerError::Transport(e.to_string())
        })?;

        tracing::info!(kind = ?email.kind, "email sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailerError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailerError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email_verification(
        &self,
        to: &str,
        verification_url: &str,
    ) -> Result<(), MailerError> {
        self.deliver(self.templates.email_verification(to, verification_url))
            .await
    }

    async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<(), MailerError> {
        self.deliver(self.templates.password_reset(to, reset_url))
            .await
    }

    async fn send_board_invitation(
        &self,
        to: &str,
        inviter_name: &str,
        board_name: &str,
        invitation_url: &str,
    ) -> Result<(), MailerError> {
        self.deliver(
            self.templates
                .board_invitation(to, inviter_name, board_name, invitation_url),
        )
        .await
    }
}
