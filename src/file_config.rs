//! INI configuration loading.
//!
//! A configuration file declares any number of handlers and, optionally, the
//! reference listener:
//!
//! ```ini
//! [handler_collector]
//! class = socket
//! endpoint = logs.example.com:10800
//! strict = false
//! path = api
//!
//! [handler_web]
//! class = http
//! endpoint = logs.example.com
//! url = /ingest
//! json = false
//! method = POST
//!
//! [listener]
//! bind = 0.0.0.0:10800
//! workers = 4
//! saturation = block
//! ```
//!
//! Files are decoded through `encoding_rs` by label (UTF-8 unless told
//! otherwise) and parsed with `rust-ini`. Unknown keys are rejected so typos
//! do not silently fall back to defaults.

use std::fs;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use encoding_rs::Encoding;
use ini::{Ini, Properties};
use thiserror::Error;

use crate::encoder::PipeEscaping;
use crate::handler::RecordHandler;
use crate::handlers::{
    HTTPHandlerBuilder, HandlerBuildError, HandlerBuilderTrait, SocketHandlerBuilder,
};
use crate::http_handler::HTTPMethod;
use crate::listener::{ListenerConfig, SaturationPolicy};

const HANDLER_PREFIX: &str = "handler_";
const LISTENER_SECTION: &str = "listener";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} doesn't exist")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is an empty file")]
    Empty(PathBuf),
    #[error("unknown encoding {0}")]
    UnknownEncoding(String),
    #[error("contents are not valid {0}")]
    Decode(&'static str),
    #[error("invalid INI: {0}")]
    Parse(String),
    #[error("[{section}] has no class")]
    MissingClass { section: String },
    #[error("[{section}] has unknown class {class:?}")]
    UnknownClass { section: String, class: String },
    #[error("[{section}] has unknown key {key:?}")]
    UnknownKey { section: String, key: String },
    #[error("[{section}] {key}: {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
    #[error("handler {name}: {source}")]
    Build {
        name: String,
        #[source]
        source: HandlerBuildError,
    },
}

/// A handler declared in a configuration file, not yet built.
#[derive(Clone, Debug)]
pub enum HandlerConfig {
    Socket(SocketHandlerBuilder),
    Http(HTTPHandlerBuilder),
}

impl HandlerConfig {
    pub fn build(&self) -> Result<Box<dyn RecordHandler>, HandlerBuildError> {
        match self {
            HandlerConfig::Socket(builder) => builder.build(),
            HandlerConfig::Http(builder) => builder.build(),
        }
    }
}

/// Parsed configuration file.
#[derive(Clone, Debug, Default)]
pub struct FileConfig {
    /// Handlers in file order, keyed by the name after `handler_`.
    pub handlers: Vec<(String, HandlerConfig)>,
    pub listener: Option<ListenerConfig>,
}

impl FileConfig {
    pub fn handler(&self, name: &str) -> Option<&HandlerConfig> {
        self.handlers
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, config)| config)
    }

    /// Build every declared handler.
    pub fn build_handlers(&self) -> Result<Vec<(String, Box<dyn RecordHandler>)>, ConfigError> {
        self.handlers
            .iter()
            .map(|(name, config)| {
                config
                    .build()
                    .map(|handler| (name.clone(), handler))
                    .map_err(|source| ConfigError::Build {
                        name: name.clone(),
                        source,
                    })
            })
            .collect()
    }
}

/// Load a configuration file, decoding it with `encoding` (default UTF-8).
pub fn load_file(path: impl AsRef<Path>, encoding: Option<&str>) -> Result<FileConfig, ConfigError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => ConfigError::NotFound(path.to_owned()),
        _ => ConfigError::Io {
            path: path.to_owned(),
            source: err,
        },
    })?;
    if bytes.is_empty() {
        return Err(ConfigError::Empty(path.to_owned()));
    }
    let text = decode_with_encoding(&bytes, encoding.unwrap_or("utf-8"))?;
    parse_str(&text)
}

fn decode_with_encoding(bytes: &[u8], label: &str) -> Result<String, ConfigError> {
    let normalized_label = label.trim().to_ascii_lowercase();
    let encoding = Encoding::for_label(normalized_label.as_bytes())
        .ok_or_else(|| ConfigError::UnknownEncoding(label.to_owned()))?;
    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(ConfigError::Decode(encoding.name()));
    }
    Ok(decoded.into_owned())
}

/// Parse configuration text.
pub fn parse_str(text: &str) -> Result<FileConfig, ConfigError> {
    let ini = Ini::load_from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
    let mut config = FileConfig::default();
    for (section, props) in ini.iter() {
        let Some(section) = section else {
            continue;
        };
        if section == LISTENER_SECTION {
            config.listener = Some(parse_listener(props)?);
        } else if let Some(name) = section.strip_prefix(HANDLER_PREFIX) {
            config
                .handlers
                .push((name.to_owned(), parse_handler(section, props)?));
        }
    }
    Ok(config)
}

/// One section being read; every lookup reports errors against it.
struct Section<'a> {
    name: &'a str,
    props: &'a Properties,
}

impl Section<'_> {
    fn invalid(&self, key: &str, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.name.to_owned(),
            key: key.to_owned(),
            message: message.into(),
        }
    }

    fn check_keys(&self, allowed: &[&str]) -> Result<(), ConfigError> {
        match self.props.iter().find(|(key, _)| !allowed.contains(key)) {
            Some((key, _)) => Err(ConfigError::UnknownKey {
                section: self.name.to_owned(),
                key: key.to_owned(),
            }),
            None => Ok(()),
        }
    }

    fn string(&self, key: &str) -> Option<String> {
        self.props.get(key).map(|value| value.trim().to_owned())
    }

    fn parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.props
            .get(key)
            .map(|value| {
                value
                    .trim()
                    .parse()
                    .map_err(|err: T::Err| self.invalid(key, err.to_string()))
            })
            .transpose()
    }

    fn boolean(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let Some(value) = self.props.get(key) else {
            return Ok(None);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Ok(Some(true)),
            "0" | "no" | "false" | "off" => Ok(Some(false)),
            other => Err(self.invalid(key, format!("expected a boolean, got {other:?}"))),
        }
    }

    fn millis(&self, key: &str) -> Result<Option<Duration>, ConfigError> {
        match self.parsed::<u64>(key)? {
            Some(0) => Err(self.invalid(key, "must be greater than zero")),
            other => Ok(other.map(Duration::from_millis)),
        }
    }

    fn certificate(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        self.string(key)
            .map(|path| {
                fs::read(&path).map_err(|err| ConfigError::Io {
                    path: PathBuf::from(path),
                    source: err,
                })
            })
            .transpose()
    }
}

const COMMON_HANDLER_KEYS: [&str; 8] = [
    "class",
    "endpoint",
    "secure",
    "strict",
    "root_certificate",
    "connect_timeout_ms",
    "io_timeout_ms",
    "warn_interval_ms",
];

fn parse_handler(name: &str, props: &Properties) -> Result<HandlerConfig, ConfigError> {
    let section = Section { name, props };
    let class = section.string("class").ok_or_else(|| ConfigError::MissingClass {
        section: name.to_owned(),
    })?;
    match class.to_ascii_lowercase().as_str() {
        "socket" => parse_socket_handler(&section).map(HandlerConfig::Socket),
        "http" => parse_http_handler(&section).map(HandlerConfig::Http),
        _ => Err(ConfigError::UnknownClass {
            section: name.to_owned(),
            class,
        }),
    }
}

/// Settings shared by both handler classes.
macro_rules! apply_common {
    ($section:expr, $builder:expr) => {{
        let section = $section;
        let mut builder = $builder;
        if let Some(endpoint) = section.string("endpoint") {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(secure) = section.boolean("secure")? {
            builder = builder.with_secure(secure);
        }
        if let Some(strict) = section.boolean("strict")? {
            builder = builder.with_strict(strict);
        }
        if let Some(pem) = section.certificate("root_certificate")? {
            builder = builder.with_root_certificate_pem(pem);
        }
        if let Some(ms) = section.parsed::<u64>("connect_timeout_ms")? {
            builder = builder.with_connect_timeout_ms(ms);
        }
        if let Some(ms) = section.parsed::<u64>("io_timeout_ms")? {
            builder = builder.with_io_timeout_ms(ms);
        }
        if let Some(ms) = section.parsed::<u64>("warn_interval_ms")? {
            builder = builder.with_warn_interval_ms(ms);
        }
        builder
    }};
}

fn parse_socket_handler(section: &Section<'_>) -> Result<SocketHandlerBuilder, ConfigError> {
    let mut allowed = COMMON_HANDLER_KEYS.to_vec();
    allowed.extend(["path", "hostname", "escaping", "line_terminator"]);
    section.check_keys(&allowed)?;

    let mut builder = apply_common!(section, SocketHandlerBuilder::new());
    if let Some(path) = section.string("path") {
        builder = builder.with_path(path);
    }
    if let Some(hostname) = section.string("hostname") {
        builder = builder.with_hostname(hostname);
    }
    if let Some(escaping) = section.string("escaping") {
        let escaping = match escaping.to_ascii_lowercase().as_str() {
            "message" => PipeEscaping::MessageOnly,
            "all" => PipeEscaping::AllFields,
            other => {
                return Err(section.invalid(
                    "escaping",
                    format!("expected \"message\" or \"all\", got {other:?}"),
                ));
            }
        };
        builder = builder.with_escaping(escaping);
    }
    if let Some(enabled) = section.boolean("line_terminator")? {
        builder = builder.with_line_terminator(enabled);
    }
    Ok(builder)
}

fn parse_http_handler(section: &Section<'_>) -> Result<HTTPHandlerBuilder, ConfigError> {
    let mut allowed = COMMON_HANDLER_KEYS.to_vec();
    allowed.extend(["url", "method", "json"]);
    section.check_keys(&allowed)?;

    let mut builder = apply_common!(section, HTTPHandlerBuilder::new());
    if let Some(url) = section.string("url") {
        builder = builder.with_url(url);
    }
    if let Some(method) = section.parsed::<HTTPMethod>("method")? {
        builder = builder.with_method(method);
    }
    if let Some(json) = section.boolean("json")? {
        builder = builder.with_json(json);
    }
    Ok(builder)
}

fn parse_listener(props: &Properties) -> Result<ListenerConfig, ConfigError> {
    let section = Section {
        name: LISTENER_SECTION,
        props,
    };
    section.check_keys(&[
        "bind",
        "workers",
        "backlog",
        "handshake_timeout_ms",
        "read_timeout_ms",
        "max_line_length",
        "saturation",
        "warn_interval_ms",
    ])?;

    let mut config = ListenerConfig::default();
    if let Some(bind) = section.parsed::<SocketAddr>("bind")? {
        config.bind = bind;
    }
    if let Some(workers) = section.parsed::<usize>("workers")? {
        config.workers = workers;
    }
    if let Some(backlog) = section.parsed::<usize>("backlog")? {
        config.backlog = backlog;
    }
    if let Some(timeout) = section.millis("handshake_timeout_ms")? {
        config.handshake_timeout = Some(timeout);
    }
    if let Some(timeout) = section.millis("read_timeout_ms")? {
        config.read_timeout = Some(timeout);
    }
    if let Some(max) = section.parsed::<usize>("max_line_length")? {
        config.max_line_length = max;
    }
    if let Some(interval) = section.millis("warn_interval_ms")? {
        config.warn_interval = interval;
    }
    if let Some(saturation) = section.string("saturation") {
        config.saturation = match saturation.to_ascii_lowercase().as_str() {
            "reject" => SaturationPolicy::Reject,
            "block" => SaturationPolicy::Block,
            other => {
                return Err(section.invalid(
                    "saturation",
                    format!("expected \"reject\" or \"block\", got {other:?}"),
                ));
            }
        };
    }
    config
        .validate()
        .map_err(|err| section.invalid("listener", err.to_string()))?;
    Ok(config)
}
