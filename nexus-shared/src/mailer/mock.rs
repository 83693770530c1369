//! Mailers that don't talk to SMTP

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{EmailKind, EmailTemplates, Mailer, MailerError, OutgoingEmail};

/// Logs each action link instead of sending mail
///
/// Used when no SMTP host is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email_verification(
        &self,
        to: &str,
        verification_url: &str,
    ) -> Result<(), MailerError> {
        tracing::info!(to, link = verification_url, "email verification (not sent)");
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<(), MailerError> {
        tracing::info!(to, link = reset_url, "password reset (not sent)");
        Ok(())
    }

    async fn send_board_invitation(
        &self,
        to: &str,
        inviter_name: &str,
        board_name: &str,
        invitation_url: &str,
    ) -> Result<(), MailerError> {
        tracing::info!(
            to,
            inviter = inviter_name,
            board = board_name,
            link = invitation_url,
            "board invitation (not sent)"
        );
        Ok(())
    }
}

/// Renders and records every message, for assertions in tests
#[derive(Debug)]
pub struct RecordingMailer {
    templates: EmailTemplates,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Result<Self, MailerError> {
        Ok(Self {
            templates: EmailTemplates::load()?,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent_guard(&self) -> MutexGuard<'_, Vec<OutgoingEmail>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent_guard().clone()
    }

    /// Most recent message of a kind
    pub fn last(&self, kind: EmailKind) -> Option<OutgoingEmail> {
        self.sent_guard().iter().rev().find(|e| e.kind == kind).cloned()
    }

    /// `token` query parameter of the most recent link of a kind
    pub fn last_token(&self, kind: EmailKind) -> Option<String> {
        let email = self.last(kind)?;
        let (_, query) = email.link.split_once('?')?;

        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("token="))
            .map(str::to_string)
    }

    fn record(&self, email: OutgoingEmail) {
        self.sent_guard().push(email);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email_verification(
        &self,
        to: &str,
        verification_url: &str,
    ) -> Result<(), MailerError> {
        self.record(self.templates.email_verification(to, verification_url));
        Ok(())
    }

    async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<(), MailerError> {
        self.record(self.templates.password_reset(to, reset_url));
        Ok(())
    }

    async fn send_board_invitation(
        &self,
        to: &str,
        inviter_name: &str,
        board_name: &str,
        invitation_url: &str,
    ) -> Result<(), MailerError> {
        self.record(
            self.templates
                .board_invitation(to, inviter_name, board_name, invitation_url),
        );
        Ok(())
    }
}
