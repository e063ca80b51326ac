use anyhow::{Context, Result};
use auth::config::{AuthConfig, SmtpConfig};
use catalog::config::{CatalogConfig, MediaConfig};
use ordering::config::OrderingConfig;
use ordering::services::payment::PaymentGatewayConfig;
use std::env;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub token_secret: String,
    pub smtp: SmtpConfig,
    pub media: MediaConfig,
    /// Absent in development: payment confirmations are then accepted
    /// without provider verification.
    pub payment: Option<PaymentGatewayConfig>,
    /// Directory holding the built client bundle, served as a fallback.
    pub static_dir: Option<PathBuf>,
    pub auth: AuthConfig,
    pub catalog: CatalogConfig,
    pub ordering: OrderingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let smtp = SmtpConfig {
            relay: env::var("SMTP_RELAY").context("SMTP_RELAY not set")?,
            username: env::var("SMTP_USERNAME").context("SMTP_USERNAME not set")?,
            password: env::var("SMTP_PASSWORD").context("SMTP_PASSWORD not set")?,
            from: env::var("SMTP_FROM").context("SMTP_FROM not set")?,
        };

        let media = MediaConfig {
            upload_url: parse_url("MEDIA_UPLOAD_URL")?,
            api_key: env::var("MEDIA_API_KEY").context("MEDIA_API_KEY not set")?,
            folder: env::var("MEDIA_FOLDER").unwrap_or_else(|_| "products".to_owned()),
        };

        let payment = match env::var("PAYMENT_BASE_URL") {
            Ok(_) => Some(PaymentGatewayConfig {
                base_url: parse_url("PAYMENT_BASE_URL")?,
                secret_key: env::var("PAYMENT_SECRET_KEY")
                    .context("PAYMENT_SECRET_KEY not set")?,
            }),
            Err(_) => None,
        };

        let ordering = OrderingConfig {
            require_paid_before_delivery: env::var("REQUIRE_PAID_BEFORE_DELIVERY")
                .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            ..OrderingConfig::default()
        };

        let catalog = CatalogConfig {
            default_page_size: match env::var("SEARCH_PAGE_SIZE") {
                Ok(raw) => raw.parse().context("Invalid SEARCH_PAGE_SIZE")?,
                Err(_) => CatalogConfig::default().default_page_size,
            },
        };

        Ok(Self {
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            database_url: env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            token_secret: env::var("TOKEN_SECRET").context("TOKEN_SECRET not set")?,
            smtp,
            media,
            payment,
            static_dir: env::var("STATIC_DIR").ok().map(PathBuf::from),
            auth: AuthConfig::default(),
            catalog,
            ordering,
        })
    }
}

fn parse_url(key: &str) -> Result<Url> {
    env::var(key)
        .with_context(|| format!("{key} not set"))?
        .parse()
        .with_context(|| format!("Invalid {key}"))
}
