use std::fmt;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes the broker connection, publisher options and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub amqp: ConnectionConfig,
    pub publisher: PublisherSettings,
    pub logging: LoggingSettings,
}

/// Broker connection parameters.
///
/// All fields are required; there is no default broker to fall back on.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub vhost: String,
    pub use_tls: bool,
}

impl ConnectionConfig {
    pub fn scheme(&self) -> &'static str {
        if self.use_tls { "amqps" } else { "amqp" }
    }

    /// Builds the connection URI handed to the broker connector.
    ///
    /// The default vhost `/` is the empty path segment; any other `/` in a
    /// vhost name is percent-encoded.
    pub fn uri(&self) -> String {
        self.render_uri(&self.password)
    }

    /// Same as [`uri`](Self::uri) with the password masked, for logs.
    pub fn redacted_uri(&self) -> String {
        self.render_uri("***")
    }

    fn render_uri(&self, password: &str) -> String {
        format!(
            "{}://{}:{}@{}:{}/{}",
            self.scheme(),
            self.username,
            password,
            self.hostname,
            self.port,
            self.vhost_path()
        )
    }

    fn vhost_path(&self) -> String {
        if self.vhost == "/" {
            String::new()
        } else {
            self.vhost.replace('/', "%2F")
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("vhost", &self.vhost)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

/// Publisher options.
///
/// Controls the target queue, the type field and message logging. Offload
/// is enabled only when both `offload_threshold_bytes` and
/// `payload_store_path` are set.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PublisherSettings {
    pub queue_name: String,
    pub message_type_field: String,
    pub log_messages: bool,
    pub offload_threshold_bytes: Option<usize>,
    pub payload_store_path: Option<String>,
    pub payload_key_prefix: Option<String>,
}

/// Logging configuration.
///
/// `level` is the default tracing level passed to `logging::init`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration loaded from files or environment.
///
/// The `amqp` section has no defaults; the others are merged over
/// [`Settings`] defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub amqp: ConnectionConfig,
    pub publisher: Option<PartialPublisherSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

/// Partial publisher options.
///
/// Missing values fall back to [`PublisherSettings::default`].
#[derive(Debug, Deserialize)]
pub struct PartialPublisherSettings {
    pub queue_name: Option<String>,
    pub message_type_field: Option<String>,
    pub log_messages: Option<bool>,
    pub offload_threshold_bytes: Option<usize>,
    pub payload_store_path: Option<String>,
    pub payload_key_prefix: Option<String>,
}

/// Partial logging options.
///
/// A missing level falls back to `info`.
#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            queue_name: "default".to_string(),
            message_type_field: "type".to_string(),
            log_messages: false,
            offload_threshold_bytes: None,
            payload_store_path: None,
            payload_key_prefix: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl PartialSettings {
    /// Fills every missing optional value from the defaults.
    pub fn merge_with_defaults(self) -> Settings {
        let publisher_default = PublisherSettings::default();
        let logging_default = LoggingSettings::default();
        let publisher = self.publisher;

        Settings {
            amqp: self.amqp,
            publisher: PublisherSettings {
                queue_name: publisher
                    .as_ref()
                    .and_then(|p| p.queue_name.clone())
                    .unwrap_or(publisher_default.queue_name),
                message_type_field: publisher
                    .as_ref()
                    .and_then(|p| p.message_type_field.clone())
                    .unwrap_or(publisher_default.message_type_field),
                log_messages: publisher
                    .as_ref()
                    .and_then(|p| p.log_messages)
                    .unwrap_or(publisher_default.log_messages),
                offload_threshold_bytes: publisher
                    .as_ref()
                    .and_then(|p| p.offload_threshold_bytes),
                payload_store_path: publisher
                    .as_ref()
                    .and_then(|p| p.payload_store_path.clone()),
                payload_key_prefix: publisher
                    .as_ref()
                    .and_then(|p| p.payload_key_prefix.clone()),
            },
            logging: LoggingSettings {
                level: self
                    .logging
                    .and_then(|l| l.level)
                    .unwrap_or(logging_default.level),
            },
        }
    }
}
