//! Configuration loading.
//!
//! Sources, lowest precedence first: an optional `.env` file, an optional
//! `config/default.{toml,json,yaml}` file, then `MQPUB_`-prefixed environment
//! variables using `__` between path segments (`MQPUB_AMQP__HOSTNAME`).

mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{ConnectionConfig, LoggingSettings, PublisherSettings, Settings};

pub fn load_config() -> Result<Settings, ConfigError> {
    let _ = dotenvy::dotenv();

    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("MQPUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_with_defaults())
}
