//! HS256 JSON Web Token verification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{DomainError, IdentityClaims, IdentityVerifier, Result};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    /// Expected `iss`; not checked when `None`
    pub issuer: Option<String>,
    /// Expected `aud`; not checked when `None`
    pub audience: Option<String>,
    pub leeway_secs: u64,
}

/// Claims the identity provider puts in its access tokens.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aud: Option<String>,
}

pub struct JwtIdentityVerifier {
    config: JwtConfig,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    pub fn new(config: JwtConfig) -> Self {
        let decoding = DecodingKey::from_secret(config.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        match &config.issuer {
            Some(iss) => validation.set_issuer(&[iss]),
            None => validation.iss = None,
        }
        match &config.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self { config, decoding, validation }
    }

    /// Signs a token the way the identity provider would. Used for local
    /// development and by the test suites.
    pub fn sign(&self, subject: &str, email: &str, name: Option<&str>, expires_at: DateTime<Utc>) -> Result<String> {
        let claims = TokenClaims {
            sub: subject.to_string(),
            email: Some(email.to_string()),
            name: name.map(str::to_string),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };
        let key = EncodingKey::from_secret(self.config.secret.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| DomainError::Internal(format!("token signing failed: {e}")))
    }
}

fn rejection(kind: &ErrorKind) -> DomainError {
    let reason = match kind {
        ErrorKind::ExpiredSignature => "token has expired",
        ErrorKind::ImmatureSignature => "token is not valid yet",
        ErrorKind::InvalidIssuer => "token issuer is not trusted",
        ErrorKind::InvalidAudience => "token audience does not match",
        ErrorKind::InvalidSignature => "token signature is invalid",
        ErrorKind::InvalidAlgorithm => "token algorithm is not accepted",
        ErrorKind::MissingRequiredClaim(_) => "token is missing a required claim",
        _ => "token is malformed",
    };
    DomainError::Authentication(reason.into())
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<IdentityClaims> {
        let data = decode::<TokenClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            rejection(e.kind())
        })?;
        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(DomainError::Authentication("token has an empty subject".into()));
        }
        let email = claims
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| DomainError::Authentication("token carries no email".into()))?;
        Ok(IdentityClaims {
            external_id: claims.sub,
            email,
            name: claims.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: SecretString::from(secret.to_string()),
            issuer: Some("https://id.courtside.test".into()),
            audience: Some("courtside-api".into()),
            leeway_secs: 0,
        }
    }

    #[tokio::test]
    async fn valid_token_yields_normalized_claims() {
        let verifier = JwtIdentityVerifier::new(config("s3cret"));
        let token = verifier
            .sign("auth0|42", " Player@Example.com ", Some("Pat"), Utc::now() + Duration::minutes(5))
            .unwrap();
        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims.external_id, "auth0|42");
        assert_eq!(claims.email, "player@example.com");
        assert_eq!(claims.name.as_deref(), Some("Pat"));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let verifier = JwtIdentityVerifier::new(config("s3cret"));
        let token = verifier.sign("u1", "a@b.c", None, Utc::now() - Duration::minutes(5)).unwrap();
        let err = verifier.verify(&token).await.unwrap_err();
        assert_eq!(err, DomainError::Authentication("token has expired".into()));
    }

    #[tokio::test]
    async fn token_from_another_secret_or_issuer_is_rejected() {
        let verifier = JwtIdentityVerifier::new(config("s3cret"));
        let forged = JwtIdentityVerifier::new(config("other")).sign("u1", "a@b.c", None, Utc::now() + Duration::minutes(5)).unwrap();
        assert!(matches!(verifier.verify(&forged).await, Err(DomainError::Authentication(_))));

        let foreign = JwtIdentityVerifier::new(JwtConfig { issuer: Some("https://evil.test".into()), ..config("s3cret") })
            .sign("u1", "a@b.c", None, Utc::now() + Duration::minutes(5))
            .unwrap();
        assert_eq!(
            verifier.verify(&foreign).await.unwrap_err(),
            DomainError::Authentication("token issuer is not trusted".into())
        );
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let verifier = JwtIdentityVerifier::new(config("s3cret"));
        assert!(matches!(verifier.verify("not.a.jwt").await, Err(DomainError::Authentication(_))));
    }
}
