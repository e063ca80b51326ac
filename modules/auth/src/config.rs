use compact_str::CompactString;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TokenConfig {
    /// Lifetime of issued bearer tokens.
    #[serde(default = "default_token_ttl")]
    pub ttl: time::Duration,
    #[serde(default = "default_issuer")]
    pub issuer: CompactString,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl: default_token_ttl(),
            issuer: default_issuer(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResetOtpConfig {
    pub expire_after: time::Duration,
    pub resend_interval: time::Duration,
}

impl Default for ResetOtpConfig {
    fn default() -> Self {
        Self {
            expire_after: time::Duration::minutes(10),
            resend_interval: time::Duration::minutes(1),
        }
    }
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct SmtpConfig {
    pub relay: String,
    pub username: String,
    pub password: String,
    /// Sender mailbox, e.g. `Storefront <no-reply@example.com>`.
    pub from: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("relay", &self.relay)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from", &self.from)
            .finish()
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub reset_otp: ResetOtpConfig,
}

fn default_token_ttl() -> time::Duration {
    time::Duration::days(7)
}

fn default_issuer() -> CompactString {
    CompactString::const_new("storefront")
}
