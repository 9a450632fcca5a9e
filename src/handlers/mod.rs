//! Handler builders and associated traits.
//!
//! Provides a minimal builder API for constructing handlers in a
//! type-safe manner. Each builder implements [`HandlerBuilderTrait`]
//! which returns either the concrete handler or a boxed
//! [`RecordHandler`] ready for registration with a dispatcher.

use std::io;

use thiserror::Error;

use crate::handler::RecordHandler;

mod builder_macros;
pub mod http_builder;
pub mod socket_builder;

pub use http_builder::HTTPHandlerBuilder;
pub use socket_builder::SocketHandlerBuilder;

/// Errors that may occur while building a handler.
#[derive(Debug, Error)]
pub enum HandlerBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid handler configuration: {0}")]
    InvalidConfig(String),
    /// Underlying I/O error whilst creating the handler.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The TLS backend rejected the settings or certificate material.
    #[error("TLS configuration error: {0}")]
    Tls(#[from] native_tls::Error),
}

/// Trait implemented by all handler builders.
pub trait HandlerBuilderTrait: Send + Sync {
    /// Concrete handler type produced by the builder.
    type Handler: RecordHandler + 'static;

    /// Build the concrete handler.
    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError>;

    /// Build the handler behind a trait object.
    fn build(&self) -> Result<Box<dyn RecordHandler>, HandlerBuildError> {
        Ok(Box::new(self.build_inner()?))
    }
}
