use std::env;

/// Falls back to central São Paulo when no coordinate is supplied.
pub const FALLBACK_LATITUDE: f64 = -23.5505;
pub const FALLBACK_LONGITUDE: f64 = -46.6333;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub storage_path: String,
    pub public_base_url: String,
    pub static_dir: String,
    pub jwt_secret: String,
    pub weather_api_url: String,
    pub default_latitude: f64,
    pub default_longitude: f64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/canteiro.db?mode=rwc".to_string()),
            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "./data/uploads".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "static".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "development-secret-change-in-production".to_string()),
            weather_api_url: env::var("WEATHER_API_URL")
                .unwrap_or_else(|_| "https://api.open-meteo.com/v1/forecast".to_string()),
            default_latitude: env::var("DEFAULT_LATITUDE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(FALLBACK_LATITUDE),
            default_longitude: env::var("DEFAULT_LONGITUDE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(FALLBACK_LONGITUDE),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
        }
    }

    /// Configuration for tests: in-memory database, storage under `storage_path`.
    pub fn for_tests(storage_path: &str) -> Self {
        Self {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            storage_path: storage_path.to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            static_dir: "static".to_string(),
            jwt_secret: "test-secret".to_string(),
            weather_api_url: "http://127.0.0.1:9/forecast".to_string(),
            default_latitude: FALLBACK_LATITUDE,
            default_longitude: FALLBACK_LONGITUDE,
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
        }
    }
}
