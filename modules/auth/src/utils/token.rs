use compact_str::CompactString;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::entities::db::account::Account;

/// Signed bearer token string.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AsRef<str> for AccessToken {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl AccessToken {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken([REDACTED])")
    }
}

/// Claims carried by issued tokens.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct TokenClaims {
    /// Account ID
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub admin: bool,
    pub exp: usize,
    pub iss: CompactString,
}

/// Issues and validates bearer tokens. Cheap to clone; shared by the sign-in
/// paths and the per-request auth middleware.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: time::Duration,
    issuer: CompactString,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str, config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: config.ttl,
            issuer: config.issuer.clone(),
        }
    }

    pub fn issue(&self, account: &Account) -> Result<AccessToken, framework::Error> {
        let expires_at = time::OffsetDateTime::now_utc() + self.ttl;
        let claims = TokenClaims {
            sub: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            admin: account.is_admin,
            exp: expires_at.unix_timestamp() as usize,
            iss: self.issuer.clone(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map(AccessToken)
            .map_err(|e| {
                framework::Error::BusinessPanic(anyhow::anyhow!("token signing failed: {e}"))
            })
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framework::now_time;

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Ada".to_owned(),
            email: "ada@example.com".to_owned(),
            password_hash: "x".to_owned(),
            is_admin: true,
            reset_token: None,
            reset_token_expires_at: None,
            reset_token_sent_at: None,
            created_at: now_time(),
            updated_at: now_time(),
        }
    }

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", &TokenConfig::default())
    }

    #[test]
    fn round_trips_identity_and_admin_flag() -> Result<(), framework::Error> {
        let signer = signer();
        let account = account();
        let token = signer.issue(&account)?;
        let claims = signer.verify(token.as_ref()).map_err(|e| {
            framework::Error::BusinessPanic(anyhow::anyhow!("verify failed: {e}"))
        })?;
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.email, account.email);
        assert!(claims.admin);
        Ok(())
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() -> Result<(), framework::Error> {
        let token = signer().issue(&account())?;
        let other = TokenSigner::new("a different secret", &TokenConfig::default());
        assert!(other.verify(token.as_ref()).is_err());
        Ok(())
    }

    #[test]
    fn rejects_expired_tokens() -> Result<(), framework::Error> {
        let config = TokenConfig {
            ttl: time::Duration::seconds(-60),
            ..TokenConfig::default()
        };
        let signer = TokenSigner::new("test-secret", &config);
        let token = signer.issue(&account())?;
        assert!(signer.verify(token.as_ref()).is_err());
        Ok(())
    }

    #[test]
    fn rejects_tampered_tokens() -> Result<(), framework::Error> {
        let token = signer().issue(&account())?.into_inner();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(signer().verify(&tampered).is_err());
        Ok(())
    }
}
