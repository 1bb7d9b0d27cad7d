use anyhow::Context;
use serde::Deserialize;

pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// 60 days
pub const DEFAULT_TTL_MINUTES: i64 = 60 * 24 * 60;
/// 10 years; keeps `exp` well inside the range `time` can represent.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "conduit".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "conduit-users".into()),
            ttl_minutes: parse_ttl_minutes(std::env::var("JWT_TTL_MINUTES").ok().as_deref()),
        };
        let bcrypt_cost = parse_bcrypt_cost(std::env::var("BCRYPT_COST").ok().as_deref());
        Ok(Self {
            database_url,
            jwt,
            bcrypt_cost,
        })
    }
}

/// Out-of-range or unparsable values fall back to the default.
fn parse_ttl_minutes(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|m| (1..=MAX_TTL_MINUTES).contains(m))
        .unwrap_or(DEFAULT_TTL_MINUTES)
}

fn parse_bcrypt_cost(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|c| (MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(c))
        .unwrap_or(DEFAULT_BCRYPT_COST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_defaults_when_missing_or_garbage() {
        assert_eq!(parse_ttl_minutes(None), DEFAULT_TTL_MINUTES);
        assert_eq!(parse_ttl_minutes(Some("soon")), DEFAULT_TTL_MINUTES);
        assert_eq!(parse_ttl_minutes(Some("90")), 90);
    }

    #[test]
    fn ttl_out_of_range_falls_back() {
        assert_eq!(parse_ttl_minutes(Some("0")), DEFAULT_TTL_MINUTES);
        assert_eq!(parse_ttl_minutes(Some("-5")), DEFAULT_TTL_MINUTES);
        assert_eq!(
            parse_ttl_minutes(Some(&i64::MAX.to_string())),
            DEFAULT_TTL_MINUTES
        );
        assert_eq!(
            parse_ttl_minutes(Some(&MAX_TTL_MINUTES.to_string())),
            MAX_TTL_MINUTES
        );
    }

    #[test]
    fn bcrypt_cost_bounds() {
        assert_eq!(parse_bcrypt_cost(None), DEFAULT_BCRYPT_COST);
        assert_eq!(parse_bcrypt_cost(Some("4")), MIN_BCRYPT_COST);
        assert_eq!(parse_bcrypt_cost(Some("12")), 12);
        assert_eq!(parse_bcrypt_cost(Some("3")), DEFAULT_BCRYPT_COST);
        assert_eq!(parse_bcrypt_cost(Some("32")), DEFAULT_BCRYPT_COST);
    }
}
