use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpSettings;
use crate::error::ApiError;

/// Outbound email transport, used to deliver password reset links.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn from_settings(settings: &SmtpSettings) -> Result<Self, ApiError> {
        let from = format!("{} <{}>", settings.from_name, settings.from_email)
            .parse()
            .map_err(|error| ApiError::Internal(format!("Invalid sender address: {error}")))?;
        let transport = build_transport(settings)?;
        Ok(Mailer { transport, from })
    }

    /// Sends the password recovery email containing the reset URL.
    ///
    /// A delivery failure is surfaced as an internal error so the caller can
    /// roll back the stored reset token fields.
    pub async fn send_password_reset(
        &self,
        to_email: &str,
        to_name: &str,
        reset_url: &str,
    ) -> Result<(), ApiError> {
        let to: Mailbox = format!("{to_name} <{to_email}>")
            .parse()
            .or_else(|_| to_email.parse())
            .map_err(|error| ApiError::Internal(format!("Invalid recipient address: {error}")))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Shop password recovery")
            .header(ContentType::TEXT_PLAIN)
            .body(password_reset_body(reset_url))
            .map_err(|error| ApiError::Internal(format!("Building the email failed: {error}")))?;
        self.transport
            .send(message)
            .await
            .map_err(|error| ApiError::Internal(format!("Sending the email failed: {error}")))?;
        Ok(())
    }
}

fn build_transport(
    settings: &SmtpSettings,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, ApiError> {
    let mut builder = if settings.use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|error| ApiError::Internal(format!("Creating the SMTP relay failed: {error}")))?
            .port(settings.port)
    } else {
        // Plaintext transport for local development servers such as Mailpit.
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host).port(settings.port)
    };
    if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }
    Ok(builder.build())
}

/// Body of the password recovery email.
pub fn password_reset_body(reset_url: &str) -> String {
    format!(
        "Your password reset token is:\n\n{reset_url}\n\nIf you have not requested this email, please ignore it."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "localhost".to_string(),
            port: 1025,
            from_name: "Shop".to_string(),
            from_email: "noreply@localhost".to_string(),
            username: None,
            password: None,
            use_tls: false,
        }
    }

    #[test]
    fn mailer_builds_from_plaintext_settings() {
        assert!(Mailer::from_settings(&settings()).is_ok());
    }

    #[test]
    fn reset_body_embeds_the_url() {
        let body = password_reset_body("http://localhost:8000/api/v1/password/reset/abc");
        assert!(body.contains("/api/v1/password/reset/abc"));
        assert!(body.contains("please ignore it"));
    }
}
