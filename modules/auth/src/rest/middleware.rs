use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request};
use uuid::Uuid;

use crate::utils::token::TokenSigner;

/// Identity decoded from the bearer token, inserted into request extensions
/// by [`UserAuthLayer`] when the token checks out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = framework::Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(framework::Error::Unauthenticated)
    }
}

/// Extractor for admin-gated handlers.
#[derive(Clone, Debug)]
pub struct AdminUser(pub CurrentUser);

impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = framework::Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if user.is_admin {
            Ok(Self(user))
        } else {
            Err(framework::Error::Forbidden)
        }
    }
}

/// Attaches the caller's identity to every request that carries a valid
/// bearer token. Requests without one pass through untouched; handlers that
/// need an identity fail at extraction instead.
#[derive(Clone)]
pub struct UserAuthLayer {
    verifier: TokenSigner,
}

impl UserAuthLayer {
    pub fn new(verifier: TokenSigner) -> Self {
        Self { verifier }
    }
}

impl<S> tower::Layer<S> for UserAuthLayer {
    type Service = UserAuthMiddleware<S>;
    fn layer(&self, inner: S) -> Self::Service {
        UserAuthMiddleware {
            inner,
            verifier: self.verifier.clone(),
        }
    }
}

#[derive(Clone)]
pub struct UserAuthMiddleware<S> {
    inner: S,
    verifier: TokenSigner,
}

impl<S, B> tower::Service<Request<B>> for UserAuthMiddleware<S>
where
    S: tower::Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        if let Some(user) = user_auth(req.headers(), &self.verifier) {
            req.extensions_mut().insert(user);
        }
        self.inner.call(req)
    }
}

fn user_auth(headers: &HeaderMap, verifier: &TokenSigner) -> Option<CurrentUser> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    let claims = verifier.verify(token).ok()?;
    Some(CurrentUser {
        id: claims.sub,
        name: claims.name,
        email: claims.email,
        is_admin: claims.admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::entities::db::account::Account;
    use framework::now_time;

    fn signer() -> TokenSigner {
        TokenSigner::new("middleware-test-secret", &TokenConfig::default())
    }

    fn account(is_admin: bool) -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Grace".to_owned(),
            email: "grace@example.com".to_owned(),
            password_hash: "x".to_owned(),
            is_admin,
            reset_token: None,
            reset_token_expires_at: None,
            reset_token_sent_at: None,
            created_at: now_time(),
            updated_at: now_time(),
        }
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = format!("Bearer {token}").parse() {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    #[test]
    fn resolves_identity_from_a_bearer_token() -> Result<(), framework::Error> {
        let signer = signer();
        let account = account(true);
        let token = signer.issue(&account)?;
        let user = user_auth(&bearer_headers(token.as_ref()), &signer);
        assert_eq!(
            user,
            Some(CurrentUser {
                id: account.id,
                name: account.name,
                email: account.email,
                is_admin: true,
            })
        );
        Ok(())
    }

    #[test]
    fn ignores_missing_or_malformed_headers() -> Result<(), framework::Error> {
        let signer = signer();
        assert_eq!(user_auth(&HeaderMap::new(), &signer), None);

        // token without the scheme prefix
        let token = signer.issue(&account(false))?;
        let mut headers = HeaderMap::new();
        if let Ok(value) = token.as_ref().parse() {
            headers.insert(AUTHORIZATION, value);
        }
        assert_eq!(user_auth(&headers, &signer), None);

        assert_eq!(user_auth(&bearer_headers("not-a-jwt"), &signer), None);
        Ok(())
    }
}
