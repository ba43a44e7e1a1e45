use chrono_tz::Tz;

/// Default civil timezone for parks that do not carry their own.
pub const DEFAULT_PARK_TIMEZONE: &str = "America/New_York";

/// Where wait-time data is read from.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    /// Direct Postgres connection via sqlx.
    Postgres { database_url: String },
    /// Supabase-style PostgREST endpoint over HTTPS.
    Postgrest { base_url: String, api_key: String },
}

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub port: u16,
    /// Fallback timezone for parks with an empty `timezone` column.
    pub park_timezone: Tz,
    /// Extra attempts after a retryable data-store failure.
    pub gateway_retries: u32,
    /// Interval between background wait-sample refreshes.
    pub wait_refresh_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let backend = match std::env::var("DATABASE_URL") {
            Ok(database_url) if !database_url.is_empty() => StoreBackend::Postgres { database_url },
            _ => StoreBackend::Postgrest {
                base_url: std::env::var("SUPABASE_URL")
                    .expect("DATABASE_URL or SUPABASE_URL must be set"),
                api_key: std::env::var("SUPABASE_ANON_KEY")
                    .expect("SUPABASE_ANON_KEY must be set when using SUPABASE_URL"),
            },
        };

        Self {
            backend,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            park_timezone: std::env::var("PARK_TIMEZONE")
                .unwrap_or_else(|_| DEFAULT_PARK_TIMEZONE.to_string())
                .parse()
                .expect("PARK_TIMEZONE must be an IANA timezone name"),
            gateway_retries: std::env::var("GATEWAY_RETRIES")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .expect("GATEWAY_RETRIES must be a non-negative integer"),
            wait_refresh_secs: parse_refresh_secs(
                &std::env::var("WAIT_REFRESH_SECS").unwrap_or_else(|_| "600".to_string()),
            )
            .unwrap_or_else(|e| panic!("{}", e)),
        }
    }
}

/// Refresh interval in seconds. Zero would make the refresher spin.
fn parse_refresh_secs(raw: &str) -> Result<u64, String> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err("WAIT_REFRESH_SECS must be greater than zero".to_string()),
        Ok(secs) => Ok(secs),
        Err(_) => Err(format!(
            "WAIT_REFRESH_SECS must be a number of seconds, got '{}'",
            raw
        )),
    }
}
