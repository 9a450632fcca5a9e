//! HTTP transport: one request per record.

use std::{error::Error as StdError, io, sync::Arc};

use log::debug;
use ureq::{Agent, AgentBuilder, Response};

use crate::{
    encoder::encode_http_payload,
    error::{DeliveryError, Stage},
    handler::{ShippingHandler, Transport},
    log_record::LogRecord,
};

use super::config::{HTTPHandlerConfig, HTTPMethod, append_query};

/// Sends each record as a single HTTP(S) request and discards the reply.
pub struct HTTPTransport {
    config: HTTPHandlerConfig,
    agent: Agent,
    target_url: String,
}

/// HTTP transport wired to an error reporter.
pub type HTTPHandler = ShippingHandler<HTTPTransport>;

impl HTTPTransport {
    /// Construct the transport.
    ///
    /// # Errors
    ///
    /// Fails if the platform TLS backend rejects the TLS settings.
    pub fn new(config: HTTPHandlerConfig) -> Result<Self, native_tls::Error> {
        // Redirects are not followed; the reply is discarded either way.
        // Every record gets a fresh connection, so nothing is kept idle.
        let mut builder = AgentBuilder::new()
            .redirects(0)
            .max_idle_connections(0)
            .max_idle_connections_per_host(0);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.timeout_connect(timeout);
        }
        if let Some(timeout) = config.io_timeout {
            builder = builder.timeout_read(timeout).timeout_write(timeout);
        }
        if let Some(tls) = &config.tls {
            builder = builder.tls_connector(Arc::new(tls.connector()?));
        }
        let target_url = config.target_url();
        Ok(Self {
            agent: builder.build(),
            config,
            target_url,
        })
    }

    pub fn config(&self) -> &HTTPHandlerConfig {
        &self.config
    }

    fn host_header(&self) -> String {
        self.config.endpoint.url_host()
    }

    fn send(&self, payload_body: &str, content_type: &str) -> Result<Response, ureq::Error> {
        let host = self.host_header();
        match self.config.effective_method() {
            HTTPMethod::GET => {
                let url = append_query(&self.target_url, payload_body);
                self.agent
                    .get(&url)
                    .set("Host", &host)
                    .set("Connection", "close")
                    .call()
            }
            HTTPMethod::POST => self
                .agent
                .post(&self.target_url)
                .set("Host", &host)
                .set("Connection", "close")
                .set("Content-Type", content_type)
                .send_string(payload_body),
        }
    }

    fn transport_error(&self, err: &ureq::Transport) -> DeliveryError {
        let endpoint = self.config.endpoint.to_string();
        match io_source(err) {
            Some(io_err) if io_err.kind() == io::ErrorKind::ConnectionRefused => {
                DeliveryError::ConnectionRefused { endpoint }
            }
            Some(io_err)
                if matches!(
                    io_err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                ) =>
            {
                let stage = match err.kind() {
                    ureq::ErrorKind::ConnectionFailed => Stage::Connect,
                    _ => Stage::Response,
                };
                DeliveryError::TimedOut { endpoint, stage }
            }
            _ => DeliveryError::Http {
                url: self.target_url.clone(),
                message: err.to_string(),
            },
        }
    }
}

fn io_source<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a io::Error> {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return Some(io_err);
        }
        current = err.source();
    }
    None
}

/// Read the reply to the end so the exchange completes, then drop it.
fn discard(response: Response) {
    let status = response.status();
    if let Err(err) = io::copy(&mut response.into_reader(), &mut io::sink()) {
        debug!("logship: error reading HTTP {status} reply: {err}");
    }
}

impl Transport for HTTPTransport {
    fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let payload = encode_http_payload(record, self.config.format)?;
        match self.send(&payload.body, payload.content_type) {
            Ok(response) | Err(ureq::Error::Status(_, response)) => {
                discard(response);
                Ok(())
            }
            Err(ureq::Error::Transport(err)) => Err(self.transport_error(&err)),
        }
    }
}

impl std::fmt::Debug for HTTPTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HTTPTransport")
            .field("target_url", &self.target_url)
            .field("method", &self.config.effective_method())
            .field("format", &self.config.format)
            .finish()
    }
}
