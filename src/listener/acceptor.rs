//! Server-side TLS for the listener.

use native_tls::{Identity, Protocol, TlsAcceptor};

/// TLS 1.2 acceptor built from caller-supplied key material.
///
/// Loading the material (file paths, secrets stores) is left to the caller.
#[derive(Clone)]
pub struct ServerTls {
    acceptor: TlsAcceptor,
}

impl ServerTls {
    pub fn from_identity(identity: Identity) -> Result<Self, native_tls::Error> {
        let acceptor = TlsAcceptor::builder(identity)
            .min_protocol_version(Some(Protocol::Tlsv12))
            .max_protocol_version(Some(Protocol::Tlsv12))
            .build()?;
        Ok(Self { acceptor })
    }

    /// Build from a PEM certificate chain and a PEM PKCS#8 private key.
    pub fn from_pkcs8_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, native_tls::Error> {
        Self::from_identity(Identity::from_pkcs8(cert_pem, key_pem)?)
    }

    pub(crate) fn acceptor(&self) -> &TlsAcceptor {
        &self.acceptor
    }
}

impl std::fmt::Debug for ServerTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerTls").finish_non_exhaustive()
    }
}
