use core_config::{app_info, env_or_default, server::ServerConfig, AppInfo, FromEnv};
use domain_collections::TransferConfig;
use std::time::Duration;

// Import database config from the database library
use database::postgres::PostgresConfig;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Application-specific configuration
/// Composes shared config components from the `core_config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    pub transfer: TransferConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // Required - will fail if not set
        let server = ServerConfig::from_env()?; // Uses defaults: HOST=0.0.0.0, PORT=8080
        let transfer = transfer_config_from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            server,
            environment,
            transfer,
        })
    }
}

/// Transfer engine tuning:
/// - `TRANSFER_BATCH_SIZE` (optional, default: 200)
/// - `TRANSFER_THROTTLE_MS` (optional, default: 100)
fn transfer_config_from_env() -> eyre::Result<TransferConfig> {
    let defaults = TransferConfig::default();

    let batch_size: usize = env_or_default("TRANSFER_BATCH_SIZE", &defaults.batch_size.to_string())
        .parse()
        .map_err(|e| eyre::eyre!("Failed to parse TRANSFER_BATCH_SIZE: {}", e))?;
    if batch_size == 0 {
        return Err(eyre::eyre!("TRANSFER_BATCH_SIZE must be greater than zero"));
    }

    let throttle_ms: u64 = env_or_default(
        "TRANSFER_THROTTLE_MS",
        &defaults.throttle.as_millis().to_string(),
    )
    .parse()
    .map_err(|e| eyre::eyre!("Failed to parse TRANSFER_THROTTLE_MS: {}", e))?;

    Ok(TransferConfig {
        batch_size,
        throttle: Duration::from_millis(throttle_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_config_defaults() {
        temp_env::with_vars(
            [
                ("TRANSFER_BATCH_SIZE", None::<&str>),
                ("TRANSFER_THROTTLE_MS", None::<&str>),
            ],
            || {
                let config = transfer_config_from_env().unwrap();
                assert_eq!(config.batch_size, 200);
                assert_eq!(config.throttle, Duration::from_millis(100));
            },
        );
    }

    #[test]
    fn test_transfer_config_custom_values() {
        temp_env::with_vars(
            [
                ("TRANSFER_BATCH_SIZE", Some("50")),
                ("TRANSFER_THROTTLE_MS", Some("0")),
            ],
            || {
                let config = transfer_config_from_env().unwrap();
                assert_eq!(config.batch_size, 50);
                assert!(config.throttle.is_zero());
            },
        );
    }

    #[test]
    fn test_transfer_config_rejects_zero_batch() {
        temp_env::with_var("TRANSFER_BATCH_SIZE", Some("0"), || {
            assert!(transfer_config_from_env().is_err());
        });
    }
}
