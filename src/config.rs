use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Self::Memory,
            _ => Self::Postgres,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    /// JSON file with profiles and team links, loaded into the memory backend.
    pub memory_seed_file: Option<String>,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    /// Comma-separated `CORS_EXTRA_ORIGINS`, allowed next to `frontend_url`.
    pub cors_extra_origins: Vec<String>,

    pub jwt_secret: String,

    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub assistant_timeout_secs: u64,
    pub assistant_rate_limit_per_hour: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let storage_backend = StorageBackend::parse(
            &env::var("STORAGE_BACKEND").unwrap_or_else(|_| "postgres".into()),
        );
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            panic!("DATABASE_URL must be set when STORAGE_BACKEND=postgres");
        }

        Self {
            storage_backend,
            database_url,
            memory_seed_file: env::var("MEMORY_SEED_FILE").ok().filter(|s| !s.is_empty()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            cors_extra_origins: env::var("CORS_EXTRA_ORIGINS")
                .map(|raw| split_origins(&raw))
                .unwrap_or_default(),

            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),

            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            assistant_timeout_secs: env::var("ASSISTANT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
            assistant_rate_limit_per_hour: env::var("ASSISTANT_RATE_LIMIT_PER_HOUR")
                .unwrap_or_else(|_| "20".into())
                .parse()
                .unwrap_or(20),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            storage_backend: StorageBackend::Memory,
            database_url: None,
            memory_seed_file: None,
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:5173".into(),
            cors_extra_origins: Vec::new(),
            jwt_secret: "test-secret".into(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".into(),
            openai_base_url: "http://127.0.0.1:9".into(),
            assistant_timeout_secs: 2,
            assistant_rate_limit_per_hour: 20,
        }
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_defaults_to_postgres() {
        assert_eq!(StorageBackend::parse("memory"), StorageBackend::Memory);
        assert_eq!(StorageBackend::parse(" MEM "), StorageBackend::Memory);
        assert_eq!(StorageBackend::parse("postgres"), StorageBackend::Postgres);
        assert_eq!(StorageBackend::parse("whatever"), StorageBackend::Postgres);
    }

    #[test]
    fn extra_origins_are_split_and_trimmed() {
        assert_eq!(
            split_origins(" https://a.example, ,https://b.example "),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(split_origins("").is_empty());
    }
}
