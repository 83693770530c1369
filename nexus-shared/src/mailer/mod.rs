/// Transactional email
///
/// The [`Mailer`] trait is injected wherever mail is sent. Templates are
/// parsed once by [`EmailTemplates::load`] and owned by the mailer that uses
/// them; nothing is parsed at send time.
///
/// # Implementations
///
/// - [`SmtpMailer`]: SMTP over tokio via `lettre`
/// - [`LogMailer`]: logs the action link, for local runs without SMTP
/// - [`RecordingMailer`]: keeps rendered messages in memory, for tests

use async_trait::async_trait;
use chrono::{Datelike, Utc};

pub mod mock;
pub mod smtp;
pub mod template;

pub use mock::{LogMailer, RecordingMailer};
pub use smtp::{SmtpConfig, SmtpMailer};
pub use template::Template;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("template {name} is invalid: {reason}")]
    Template { name: &'static str, reason: String },

    #[error("invalid address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("failed to send message: {0}")]
    Transport(String),
}

/// Kind of transactional email
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    EmailVerification,
    PasswordReset,
    BoardInvitation,
}

/// A rendered email ready for delivery
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub kind: EmailKind,
    pub to: String,
    pub subject: String,
    pub html: String,

    /// The action link embedded in the body
    pub link: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email_verification(
        &self,
        to: &str,
        verification_url: &str,
    ) -> Result<(), MailerError>;

    async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<(), MailerError>;

    async fn send_board_invitation(
        &self,
        to: &str,
        inviter_name: &str,
        board_name: &str,
        invitation_url: &str,
    ) -> Result<(), MailerError>;
}

const VERIFY_EMAIL_HTML: &str = include_str!("../../templates/verify-email.html");
const PASSWORD_RESET_HTML: &str = include_str!("../../templates/password-reset.html");
const BOARD_INVITATION_HTML: &str = include_str!("../../templates/board-invitation.html");

/// The parsed set of email templates
#[derive(Debug, Clone)]
pub struct EmailTemplates {
    verify_email: Template,
    password_reset: Template,
    board_invitation: Template,
}

impl EmailTemplates {
    /// Parses the embedded templates
    pub fn load() -> Result<Self, MailerError> {
        Ok(Self {
            verify_email: Template::parse(
                "verify-email",
                VERIFY_EMAIL_HTML,
                &["verification_url", "year"],
            )?,
            password_reset: Template::parse(
                "password-reset",
                PASSWORD_RESET_HTML,
                &["password_reset_url", "year"],
            )?,
            board_invitation: Template::parse(
                "board-invitation",
                BOARD_INVITATION_HTML,
                &["inviter_name", "board_name", "invitation_url", "year"],
            )?,
        })
    }

    pub fn email_verification(&self, to: &str, verification_url: &str) -> OutgoingEmail {
        let year = current_year();
        OutgoingEmail {
            kind: EmailKind::EmailVerification,
            to: to.to_string(),
            subject: "Verify your email address".to_string(),
            html: self.verify_email.render(&[
                ("verification_url", verification_url),
                ("year", &year),
            ]),
            link: verification_url.to_string(),
        }
    }

    pub fn password_reset(&self, to: &str, reset_url: &str) -> OutgoingEmail {
        let year = current_year();
        OutgoingEmail {
            kind: EmailKind::PasswordReset,
            to: to.to_string(),
            subject: "Reset your password".to_string(),
            html: self.password_reset.render(&[
                ("password_reset_url", reset_url),
                ("year", &year),
            ]),
            link: reset_url.to_string(),
        }
    }

    pub fn board_invitation(
        &self,
        to: &str,
        inviter_name: &str,
        board_name: &str,
        invitation_url: &str,
    ) -> OutgoingEmail {
        let year = current_year();
        OutgoingEmail {
            kind: EmailKind::BoardInvitation,
            to: to.to_string(),
            subject: format!("{} invited you to {}", inviter_name, board_name),
            html: self.board_invitation.render(&[
                ("inviter_name", inviter_name),
                ("board_name", board_name),
                ("invitation_url", invitation_url),
                ("year", &year),
            ]),
            link: invitation_url.to_string(),
        }
    }
}

fn current_year() -> String {
    Utc::now().year().to_string()
}
