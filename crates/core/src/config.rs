use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub hirewire_env: String,
    pub api_bind: String,
    pub db_max_connections: u32,
    pub service_token: String,
    pub seed_plans: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let database_url =
            std::env::var("DATABASE_URL").or_else(|_| std::env::var("HIREWIRE_DATABASE_URL"))?;
        let hirewire_env = std::env::var("HIREWIRE_ENV").unwrap_or_else(|_| "dev".to_string());
        let api_bind =
            std::env::var("HIREWIRE_API_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let db_max_connections = std::env::var("HIREWIRE_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        let service_token = std::env::var("HIREWIRE_SERVICE_TOKEN")?;
        let seed_plans = std::env::var("HIREWIRE_SEED_PLANS")
            .ok()
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        Ok(Self {
            database_url,
            hirewire_env,
            api_bind,
            db_max_connections,
            service_token,
            seed_plans,
        })
    }

    pub fn is_production(&self) -> bool {
        self.hirewire_env == "production"
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
