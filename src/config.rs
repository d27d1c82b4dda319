use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// `SameSite` attribute of the session cookie.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }

    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => anyhow::bail!("COOKIE_SAME_SITE must be strict, lax or none (got {other:?})"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
    pub same_site: SameSite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub cookie: CookieConfig,
    pub allowed_origins: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Deployment choices that
    /// would be unsafe together are rejected here so they fail at startup.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let db = DbConfig {
            url: get("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_num(&parsed("DB_MAX_CONNECTIONS", "10"), "DB_MAX_CONNECTIONS")?,
            acquire_timeout_secs: parse_num(
                &parsed("DB_ACQUIRE_TIMEOUT_SECS", "5"),
                "DB_ACQUIRE_TIMEOUT_SECS",
            )?,
        };

        let secret = get("JWT_SECRET").context("JWT_SECRET must be set")?;
        anyhow::ensure!(!secret.trim().is_empty(), "JWT_SECRET must not be empty");
        let jwt = JwtConfig {
            secret,
            issuer: parsed("JWT_ISSUER", "taskvault"),
            audience: parsed("JWT_AUDIENCE", "taskvault-users"),
            ttl_minutes: parse_num(&parsed("JWT_TTL_MINUTES", "10080"), "JWT_TTL_MINUTES")?,
        };
        anyhow::ensure!(jwt.ttl_minutes > 0, "JWT_TTL_MINUTES must be positive");

        let cookie = CookieConfig {
            name: parsed("COOKIE_NAME", "jwt"),
            secure: parse_bool(&parsed("COOKIE_SECURE", "false"))?,
            same_site: SameSite::parse(&parsed("COOKIE_SAME_SITE", "lax"))?,
        };
        if cookie.same_site == SameSite::None && !cookie.secure {
            anyhow::bail!("COOKIE_SAME_SITE=none requires COOKIE_SECURE=true");
        }

        let allowed_origins: Vec<String> = parsed("ALLOWED_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if allowed_origins.iter().any(|o| o == "*") {
            anyhow::bail!("ALLOWED_ORIGINS must list explicit origins; '*' cannot carry credentials");
        }

        Ok(Self {
            db,
            jwt,
            cookie,
            allowed_origins,
            host: parsed("APP_HOST", "0.0.0.0"),
            port: parse_num(&parsed("APP_PORT", "3001"), "APP_PORT")?,
        })
    }
}

fn parse_num<T: std::str::FromStr>(raw: &str, key: &str) -> anyhow::Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("{key} is not a valid number: {raw:?}"))
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => anyhow::bail!("expected a boolean, got {other:?}"),
    }
}
