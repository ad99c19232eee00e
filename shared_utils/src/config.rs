use thiserror::Error;

/// Errors related to application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    /// An environment variable was set but couldn't be parsed as the expected type.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn get_env_var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_u32_or(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name: name.to_string(), value }),
        Err(_) => Ok(default),
    }
}

fn get_env_var_opt(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Process-wide settings, loaded once at startup and passed down by
/// constructor injection rather than read ad hoc from the environment
/// throughout the codebase.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub mega_carpool_database_url: String,
    pub jwt_key_base64: String,
    pub jwt_rotate_key_base64: String,
    pub bytemark_base_url: String,
    pub parkmobile_base_url: String,
    pub parkmobile_client_id: String,
    pub parkmobile_client_secret: String,
    pub queue_dispatch_url: String,
    pub daily_refill_usd_limit_cents: u32,
    pub microsurvey_actor_cap: u32,
    pub microsurvey_default_tz: String,
    /// Chat-completion endpoint for `nextPushTime`. When unset, the
    /// microsurvey orchestrator runs the fixed `now + 1h` fallback policy
    /// only.
    pub microsurvey_llm_endpoint: Option<String>,
    pub microsurvey_llm_api_key: Option<String>,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: get_env_var("DATABASE_URL")?,
            mega_carpool_database_url: get_env_var("MEGA_CARPOOL_DATABASE_URL")?,
            jwt_key_base64: get_env_var("JWT_KEY")?,
            jwt_rotate_key_base64: get_env_var("JWT_ROTATE_KEY")?,
            bytemark_base_url: get_env_var_or_default(
                "BYTEMARK_BASE_URL",
                "https://api.bytemark.co/v1",
            ),
            parkmobile_base_url: get_env_var_or_default(
                "PARKMOBILE_BASE_URL",
                "https://api.parkmobile.io",
            ),
            parkmobile_client_id: get_env_var("PARKMOBILE_CLIENT_ID")?,
            parkmobile_client_secret: get_env_var("PARKMOBILE_CLIENT_SECRET")?,
            queue_dispatch_url: get_env_var("QUEUE_DISPATCH_URL")?,
            daily_refill_usd_limit_cents: get_env_u32_or("DAILY_REFILL_USD_LIMIT_CENTS", 5_000)?,
            microsurvey_actor_cap: get_env_u32_or("MICROSURVEY_ACTOR_CAP", 10_000)?,
            microsurvey_default_tz: get_env_var_or("MICROSURVEY_DEFAULT_TZ", "America/Chicago"),
            microsurvey_llm_endpoint: get_env_var_opt("MICROSURVEY_LLM_ENDPOINT"),
            microsurvey_llm_api_key: get_env_var_opt("MICROSURVEY_LLM_API_KEY"),
        })
    }
}

fn get_env_var_or_default(name: &str, default: &str) -> String {
    get_env_var_or(name, default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_var_is_reported_by_name() {
        let err = get_env_var("SHARED_UTILS_TEST_VAR_THAT_DOES_NOT_EXIST").unwrap_err();
        match err {
            ConfigError::MissingEnvVar(name) => {
                assert_eq!(name, "SHARED_UTILS_TEST_VAR_THAT_DOES_NOT_EXIST")
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn defaulted_values_fall_back_when_unset() {
        assert_eq!(
            get_env_var_or("SHARED_UTILS_TEST_DEFAULTED_VAR", "fallback"),
            "fallback"
        );
    }
}
