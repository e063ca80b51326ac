use reqwest::Client;
use url::Url;

/// Server-side confirmation against the payment provider. An order only
/// transitions to paid after the provider's API reports the charge as
/// settled; a client's own success signal is never enough.
#[derive(Clone)]
pub struct PaymentGateway {
    client: Client,
    base_url: Url,
    secret_key: String,
}

impl std::fmt::Debug for PaymentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentGateway")
            .field("base_url", &self.base_url.as_str())
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct PaymentGatewayConfig {
    pub base_url: Url,
    pub secret_key: String,
}

impl std::fmt::Debug for PaymentGatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentGatewayConfig")
            .field("base_url", &self.base_url.as_str())
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct PaymentStatus {
    status: String,
}

impl PaymentGateway {
    pub fn new(config: PaymentGatewayConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url,
            secret_key: config.secret_key,
        }
    }

    /// Looks the charge up by the reference the client received from the
    /// payment widget. Only an explicit `paid` answer counts.
    pub async fn is_settled(&self, reference: &str) -> Result<bool, framework::Error> {
        let url = self
            .base_url
            .join(&format!("payments/{reference}"))
            .map_err(|e| framework::Error::InvalidInput(format!("payment reference: {e}")))?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| framework::Error::Upstream(format!("payment provider: {e}")))?;
        if !response.status().is_success() {
            return Err(framework::Error::Upstream(format!(
                "payment provider answered {}",
                response.status()
            )));
        }
        let body: PaymentStatus = response
            .json()
            .await
            .map_err(|e| framework::Error::Upstream(format!("payment provider response: {e}")))?;
        Ok(body.status == "paid")
    }
}
