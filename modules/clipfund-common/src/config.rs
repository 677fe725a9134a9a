use anyhow::Result;

/// Application configuration loaded from environment variables.
/// Secrets and env-specific values only; business policy lives in
/// `policy.rs` as named constants.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database
    pub database_url: String,

    // Transcription
    pub deepgram_api_key: String,

    // Evaluation / auto-moderation
    pub openai_api_key: String,

    // Payments
    pub stripe_secret_key: String,

    // Blob store (video uploads)
    pub storage_base_url: String,
    pub storage_bucket: String,
    pub storage_service_key: Option<String>,

    // HTTP server
    pub api_host: String,
    pub api_port: u16,

    // Pipeline worker
    pub max_concurrent_pipelines: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")?,
            deepgram_api_key: std::env::var("DEEPGRAM_API_KEY")?,
            openai_api_key: std::env::var("OPENAI_API_KEY")?,
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY")?,
            storage_base_url: std::env::var("STORAGE_BASE_URL")?,
            storage_bucket: std::env::var("STORAGE_BUCKET")
                .unwrap_or_else(|_| "submissions".to_string()),
            storage_service_key: std::env::var("STORAGE_SERVICE_KEY").ok(),
            api_host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            max_concurrent_pipelines: std::env::var("MAX_CONCURRENT_PIPELINES")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            format!("{}...({} chars)", &val[..n], val.len())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DEEPGRAM_API_KEY: {}", preview(&self.deepgram_api_key));
        tracing::info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
        tracing::info!("  STRIPE_SECRET_KEY: {}", preview(&self.stripe_secret_key));
        tracing::info!("  STORAGE_BASE_URL: {}", self.storage_base_url);
        tracing::info!("  MAX_CONCURRENT_PIPELINES: {}", self.max_concurrent_pipelines);
    }
}
