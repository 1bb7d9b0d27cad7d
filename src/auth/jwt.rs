use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{
    auth::claims::Claims,
    config::{JwtConfig, MAX_TTL_MINUTES},
    state::AppState,
};

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes.clamp(0, MAX_TTL_MINUTES) as u64 * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: i32) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(sub = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
        })
    }

    #[test]
    fn sign_and_verify_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.sign(123).expect("sign");
        assert!(!token.is_empty());
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.user_id(), Some(123));
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn keys_from_app_state_use_configured_secret() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign(7).expect("sign");
        let claims = make_keys("test", "test", "test").verify(&token).expect("verify");
        assert_eq!(claims.user_id(), Some(7));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good_keys.sign(1).expect("sign");
        assert!(bad_keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = make_keys("one", "iss", "aud").sign(1).expect("sign");
        assert!(make_keys("two", "iss", "aud").verify(&token).is_err());
    }

    #[test]
    fn oversized_ttl_is_capped() {
        let keys = JwtKeys::from(&JwtConfig {
            secret: "s".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: i64::MAX,
        });
        assert_eq!(keys.ttl.as_secs(), MAX_TTL_MINUTES as u64 * 60);
        let claims = keys.verify(&keys.sign(1).expect("sign")).expect("verify");
        assert_eq!(claims.user_id(), Some(1));
    }

    #[test]
    fn verify_rejects_garbage() {
        assert!(make_keys("s", "iss", "aud").verify("not.a.jwt").is_err());
    }
}
