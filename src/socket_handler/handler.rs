//! Socket transport: one connection per record.

use native_tls::TlsConnector;

use crate::{
    encoder::encode_socket_line,
    error::{DeliveryError, Stage},
    handler::{ShippingHandler, Transport},
    log_record::LogRecord,
};

use super::{config::SocketHandlerConfig, local_hostname, transport::open_connection};

/// Sends each record as a pipe-delimited line over its own connection.
///
/// The transport holds only immutable configuration and the TLS connector, so
/// it can be shared freely between emitting threads.
pub struct SocketTransport {
    config: SocketHandlerConfig,
    connector: Option<TlsConnector>,
    hostname: String,
}

/// Socket transport wired to an error reporter.
pub type SocketHandler = ShippingHandler<SocketTransport>;

impl SocketTransport {
    /// Construct the transport, preparing the TLS connector up front.
    ///
    /// # Errors
    ///
    /// Fails if the platform TLS backend rejects the TLS settings.
    pub fn new(config: SocketHandlerConfig) -> Result<Self, native_tls::Error> {
        let connector = config.tls.as_ref().map(|tls| tls.connector()).transpose()?;
        let hostname = config
            .hostname
            .clone()
            .unwrap_or_else(|| local_hostname().to_owned());
        Ok(Self {
            config,
            connector,
            hostname,
        })
    }

    pub fn config(&self) -> &SocketHandlerConfig {
        &self.config
    }

    /// Render `record` exactly as it is written to the socket.
    pub fn frame(&self, record: &LogRecord) -> Vec<u8> {
        let mut line = encode_socket_line(
            record,
            &self.hostname,
            &self.config.path,
            self.config.escaping,
        );
        if self.config.line_terminator {
            line.push('\n');
        }
        line.into_bytes()
    }
}

impl Transport for SocketTransport {
    fn deliver(&self, record: &LogRecord) -> Result<(), DeliveryError> {
        let frame = self.frame(record);
        let mut connection = open_connection(
            &self.config.endpoint,
            self.connector.as_ref(),
            self.config.connect_timeout,
            self.config.io_timeout,
        )?;
        connection.write_all(&frame).map_err(|err| {
            DeliveryError::from_io(self.config.endpoint.to_string(), Stage::Write, err)
        })?;
        connection.close();
        Ok(())
    }
}

impl std::fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketTransport")
            .field("endpoint", &self.config.endpoint)
            .field("secure", &self.connector.is_some())
            .field("hostname", &self.hostname)
            .finish()
    }
}
