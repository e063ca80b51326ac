use framework::now_time;
use framework::processor::Processor;
use framework::sqlx::DatabaseProcessor;
use time::PrimitiveDateTime;
use tracing::instrument;

use crate::config::ResetOtpConfig;
use crate::entities::db::account::{
    Account, ConsumeResetToken, FindAccountByEmail, StoreResetToken,
};
use crate::services::mailer::Mailer;
use crate::utils::password::hash_password;

#[derive(Clone)]
pub struct PasswordResetService {
    pub db: DatabaseProcessor,
    pub mailer: Mailer,
    pub config: ResetOtpConfig,
}

pub fn generate_otp_code() -> String {
    use rand::Rng;
    format!("{:06}", rand::rng().random_range(0u32..1_000_000))
}

/// A token counts as current strictly before its expiry instant.
fn token_is_current(expires_at: PrimitiveDateTime, now: PrimitiveDateTime) -> bool {
    now < expires_at
}

fn recently_sent(
    sent_at: Option<PrimitiveDateTime>,
    now: PrimitiveDateTime,
    resend_interval: time::Duration,
) -> bool {
    sent_at.is_some_and(|sent| now - sent < resend_interval)
}

#[derive(Debug, Clone)]
pub struct SendResetOtp {
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResetOtpResult {
    /// Reported whether or not the account exists, so the endpoint cannot be
    /// used to probe for registered addresses.
    MaybeSent,
    RateLimited,
}

impl Processor<SendResetOtp> for PasswordResetService {
    type Output = SendResetOtpResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: SendResetOtp) -> Result<SendResetOtpResult, framework::Error> {
        let Some(account) = self
            .db
            .process(FindAccountByEmail {
                email: input.email.clone(),
            })
            .await?
        else {
            return Ok(SendResetOtpResult::MaybeSent);
        };
        let now = now_time();
        if recently_sent(account.reset_token_sent_at, now, self.config.resend_interval) {
            return Ok(SendResetOtpResult::RateLimited);
        }
        let otp_code = generate_otp_code();
        self.db
            .process(StoreResetToken {
                account_id: account.id,
                token: otp_code.clone(),
                expires_at: now + self.config.expire_after,
                sent_at: now,
            })
            .await?;

        // The transition above is complete; mail delivery is best-effort and
        // must not hold the request open or fail it.
        let mailer = self.mailer.clone();
        let valid_for = self.config.expire_after;
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_password_reset_otp(&account.email, &otp_code, valid_for)
                .await
            {
                tracing::error!("reset OTP email to account {} failed: {e}", account.id);
            }
        });
        Ok(SendResetOtpResult::MaybeSent)
    }
}

#[derive(Clone)]
pub struct ResetPassword {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

impl std::fmt::Debug for ResetPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetPassword")
            .field("email", &self.email)
            .field("otp", &"[REDACTED]")
            .field("new_password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug)]
pub enum ResetPasswordResult {
    Success(Account),
    /// Wrong email, wrong code, expired code and replayed code are
    /// indistinguishable to the caller.
    InvalidOtp,
}

impl Processor<ResetPassword> for PasswordResetService {
    type Output = ResetPasswordResult;
    type Error = framework::Error;
    #[instrument(skip_all, err)]
    async fn process(&self, input: ResetPassword) -> Result<ResetPasswordResult, framework::Error> {
        let now = now_time();
        // Cheap pre-check before paying for the argon2 hash; the conditional
        // UPDATE below remains the single authority on the token.
        let Some(account) = self
            .db
            .process(FindAccountByEmail {
                email: input.email.clone(),
            })
            .await?
        else {
            return Ok(ResetPasswordResult::InvalidOtp);
        };
        let current = account.reset_token.as_deref() == Some(input.otp.as_str())
            && account
                .reset_token_expires_at
                .is_some_and(|expires_at| token_is_current(expires_at, now));
        if !current {
            return Ok(ResetPasswordResult::InvalidOtp);
        }
        let new_password_hash = hash_password(&input.new_password).map_err(|e| {
            framework::Error::BusinessPanic(anyhow::anyhow!("password hashing failed: {e}"))
        })?;
        let consumed = self
            .db
            .process(ConsumeResetToken {
                email: input.email,
                token: input.otp,
                new_password_hash,
                now,
            })
            .await?;
        match consumed {
            Some(account) => Ok(ResetPasswordResult::Success(account)),
            None => Ok(ResetPasswordResult::InvalidOtp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn otp_codes_are_six_digits() {
        for _ in 0..32 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn token_expires_exactly_at_the_expiry_instant() {
        let issued = datetime!(2024-05-01 12:00:00);
        let expires = issued + time::Duration::minutes(10);
        assert!(token_is_current(expires, issued));
        assert!(token_is_current(expires, expires - time::Duration::seconds(1)));
        // at the instant itself the token is no longer valid
        assert!(!token_is_current(expires, expires));
        assert!(!token_is_current(expires, expires + time::Duration::seconds(1)));
    }

    #[test]
    fn resend_window_throttles_back_to_back_requests() {
        let interval = time::Duration::minutes(1);
        let now = datetime!(2024-05-01 12:00:00);
        assert!(recently_sent(Some(now - time::Duration::seconds(30)), now, interval));
        assert!(!recently_sent(Some(now - time::Duration::seconds(90)), now, interval));
        assert!(!recently_sent(None, now, interval));
    }
}
