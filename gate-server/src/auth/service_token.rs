//! Locally verified HS256 tokens used by internal services, the EMR
//! integration and automation callers.

use crate::auth::principal::ServicePrincipal;
use crate::auth::AuthError;
use crate::config::ServiceTokenConfig;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::warn;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceTokenError {
    #[error("No service token secret is configured")]
    NotConfigured,
    #[error("{0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Verifies service tokens against the shared secret. No network calls.
#[derive(Clone)]
pub struct ServiceTokenVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl ServiceTokenVerifier {
    pub fn new(config: &ServiceTokenConfig) -> Self {
        let key = config
            .secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .map(|secret| DecodingKey::from_secret(secret.as_bytes()));
        if key.is_none() {
            warn!("No service token secret configured, service routes will reject every request");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // expiry and not-before are checked when present but tokens may omit them
        validation.required_spec_claims.clear();
        validation.validate_nbf = true;
        validation.leeway = config.leeway;
        // a configured issuer or audience must also be present in the token
        match &config.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
            validation.required_spec_claims.insert("iss".to_string());
        }

        Self { key, validation }
    }

    /// Verifies `token` and returns its claims as the principal
    pub fn verify(&self, token: &str) -> Result<ServicePrincipal, AuthError> {
        let key = self
            .key
            .as_ref()
            .ok_or(AuthError::InvalidServiceToken(ServiceTokenError::NotConfigured))?;

        let data = decode::<Map<String, Value>>(token, key, &self.validation)
            .map_err(|e| AuthError::InvalidServiceToken(e.into()))?;

        Ok(ServicePrincipal {
            claims: data.claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;
    use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test_service_secret";

    fn config() -> ServiceTokenConfig {
        ServiceTokenConfig {
            secret: Some(SECRET.to_string()),
            issuer: None,
            audience: None,
            leeway: 0,
        }
    }

    fn sign(claims: Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn jwt_kind(err: AuthError) -> ErrorKind {
        match err {
            AuthError::InvalidServiceToken(ServiceTokenError::Jwt(e)) => e.into_kind(),
            other => panic!("Expected a JWT error, got {other:?}"),
        }
    }

    #[test]
    fn test_verify_without_expiry() {
        let verifier = ServiceTokenVerifier::new(&config());
        let token = sign(
            json!({ "organization_id": "org-1", "organization_name": "Acme" }),
            SECRET,
        );

        let principal = verifier.verify(&token).unwrap();
        assert_eq!(principal.organization_id().as_deref(), Some("org-1"));
        assert_eq!(principal.organization_name(), Some("Acme"));
    }

    #[test]
    fn test_verify_keeps_arbitrary_claims() {
        let verifier = ServiceTokenVerifier::new(&config());
        let token = sign(
            json!({ "emr_id": 99, "clinic": { "name": "North" } }),
            SECRET,
        );

        let principal = verifier.verify(&token).unwrap();
        assert_eq!(principal.claims["emr_id"], json!(99));
        assert_eq!(principal.claims["clinic"]["name"], json!("North"));
    }

    #[test]
    fn test_wrong_secret() {
        let verifier = ServiceTokenVerifier::new(&config());
        let token = sign(json!({ "organization_id": "org-1" }), "another-secret");
        assert!(matches!(
            jwt_kind(verifier.verify(&token).unwrap_err()),
            ErrorKind::InvalidSignature
        ));
    }

    #[test]
    fn test_expired_token() {
        let verifier = ServiceTokenVerifier::new(&config());
        let token = sign(
            json!({ "organization_id": "org-1", "exp": get_current_timestamp() - 120 }),
            SECRET,
        );
        assert!(matches!(
            jwt_kind(verifier.verify(&token).unwrap_err()),
            ErrorKind::ExpiredSignature
        ));
    }

    #[test]
    fn test_leeway_accepts_recently_expired_token() {
        let verifier = ServiceTokenVerifier::new(&ServiceTokenConfig {
            leeway: 300,
            ..config()
        });
        let token = sign(
            json!({ "organization_id": "org-1", "exp": get_current_timestamp() - 120 }),
            SECRET,
        );
        assert!(verifier.verify(&token).is_ok());
    }

    #[test]
    fn test_audience_and_issuer() {
        let verifier = ServiceTokenVerifier::new(&ServiceTokenConfig {
            issuer: Some("emr".to_string()),
            audience: Some("organization-service".to_string()),
            ..config()
        });

        let good = sign(
            json!({ "iss": "emr", "aud": "organization-service" }),
            SECRET,
        );
        assert!(verifier.verify(&good).is_ok());

        let wrong_audience = sign(json!({ "iss": "emr", "aud": "billing" }), SECRET);
        assert!(matches!(
            jwt_kind(verifier.verify(&wrong_audience).unwrap_err()),
            ErrorKind::InvalidAudience
        ));

        let wrong_issuer = sign(
            json!({ "iss": "zapier", "aud": "organization-service" }),
            SECRET,
        );
        assert!(matches!(
            jwt_kind(verifier.verify(&wrong_issuer).unwrap_err()),
            ErrorKind::InvalidIssuer
        ));

        for claims in [
            json!({ "aud": "organization-service" }),
            json!({ "iss": "emr" }),
            json!({ "organization_id": "org-1" }),
        ] {
            let token = sign(claims, SECRET);
            assert!(matches!(
                jwt_kind(verifier.verify(&token).unwrap_err()),
                ErrorKind::MissingRequiredClaim(_)
            ));
        }
    }

    #[test]
    fn test_issuer_only_leaves_audience_optional() {
        let verifier = ServiceTokenVerifier::new(&ServiceTokenConfig {
            issuer: Some("emr".to_string()),
            ..config()
        });

        assert!(verifier.verify(&sign(json!({ "iss": "emr" }), SECRET)).is_ok());
        assert!(matches!(
            jwt_kind(verifier.verify(&sign(json!({}), SECRET)).unwrap_err()),
            ErrorKind::MissingRequiredClaim(claim) if claim == "iss"
        ));
    }

    #[test]
    fn test_garbage_token() {
        let verifier = ServiceTokenVerifier::new(&config());
        assert!(matches!(
            verifier.verify("not.a.jwt"),
            Err(AuthError::InvalidServiceToken(ServiceTokenError::Jwt(_)))
        ));
    }

    #[test]
    fn test_missing_secret_rejects_everything() {
        for secret in [None, Some(String::new())] {
            let verifier = ServiceTokenVerifier::new(&ServiceTokenConfig { secret, ..config() });
            let token = sign(json!({ "organization_id": "org-1" }), SECRET);
            assert!(matches!(
                verifier.verify(&token),
                Err(AuthError::InvalidServiceToken(
                    ServiceTokenError::NotConfigured
                ))
            ));
        }
    }
}
