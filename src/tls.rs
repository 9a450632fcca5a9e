//! Client-side TLS settings shared by both transports.

use native_tls::{Certificate, Protocol, TlsConnector};

/// TLS connection options.
#[derive(Clone, Default)]
pub struct TlsOptions {
    /// Skip certificate and hostname validation when true.
    pub insecure_skip_verify: bool,
    /// Extra trust anchors added to the system store.
    pub root_certificates: Vec<Certificate>,
    /// Restrict negotiation to TLS 1.2 exactly.
    pub pin_tls12: bool,
}

impl TlsOptions {
    /// Options for a transport with the given strictness.
    pub fn strict(strict: bool) -> Self {
        Self {
            insecure_skip_verify: !strict,
            ..Self::default()
        }
    }

    pub fn with_root_certificates(mut self, roots: Vec<Certificate>) -> Self {
        self.root_certificates = roots;
        self
    }

    pub fn pinned_to_tls12(mut self) -> Self {
        self.pin_tls12 = true;
        self
    }

    pub fn connector(&self) -> Result<TlsConnector, native_tls::Error> {
        let mut builder = TlsConnector::builder();
        builder.min_protocol_version(Some(Protocol::Tlsv12));
        if self.pin_tls12 {
            builder.max_protocol_version(Some(Protocol::Tlsv12));
        }
        if self.insecure_skip_verify {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        for root in &self.root_certificates {
            builder.add_root_certificate(root.clone());
        }
        builder.build()
    }
}

impl std::fmt::Debug for TlsOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsOptions")
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("root_certificates", &self.root_certificates.len())
            .field("pin_tls12", &self.pin_tls12)
            .finish()
    }
}
