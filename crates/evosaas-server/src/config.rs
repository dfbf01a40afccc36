use anyhow::Result;

/// Placeholder secret used when `EVO_JWT_SECRET` is unset. Functional for
/// local development; any real deployment must externalize the secret.
pub const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub jwt_secret: String,
    /// Base URL of the external Evolution gateway. Carried as configuration
    /// only; nothing calls it yet.
    pub gateway_url: String,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("EVO_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("EVO_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()?;
        let cors_origin = std::env::var("EVO_CORS_ORIGIN").unwrap_or_else(|_| "*".into());
        let jwt_secret =
            std::env::var("EVO_JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.into());
        let gateway_url = std::env::var("EVOLUTION_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into());
        let environment = std::env::var("EVO_ENV").unwrap_or_else(|_| "development".into());

        Ok(Self {
            host,
            port,
            cors_origin,
            jwt_secret,
            gateway_url,
            environment,
        })
    }
}
