use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;

/// Outbound mail collaborator. Constructed once from explicit configuration
/// and handed to the services that need it; transport credentials never live
/// in process-wide state.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, framework::Error> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.relay)
            .map_err(|e| framework::Error::Upstream(format!("smtp relay {}: {e}", config.relay)))?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        let sender: Mailbox = config
            .from
            .parse()
            .map_err(|e| framework::Error::InvalidInput(format!("sender mailbox: {e}")))?;
        Ok(Self { transport, sender })
    }

    pub async fn send_password_reset_otp(
        &self,
        recipient: &str,
        otp_code: &str,
        valid_for: time::Duration,
    ) -> Result<(), framework::Error> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| framework::Error::InvalidInput(format!("recipient mailbox: {e}")))?;
        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject("Password Reset OTP")
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "Your OTP for password reset is {otp_code}. It is valid for {} minutes.",
                valid_for.whole_minutes()
            ))
            .map_err(|e| {
                framework::Error::BusinessPanic(anyhow::anyhow!("mail assembly failed: {e}"))
            })?;
        self.transport
            .send(message)
            .await
            .map_err(|e| framework::Error::Upstream(format!("smtp send: {e}")))?;
        Ok(())
    }
}
