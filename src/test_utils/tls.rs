//! Throwaway certificates for TLS tests.

use native_tls::Certificate;
use rcgen::{CertifiedKey, generate_simple_self_signed};

use crate::listener::ServerTls;

/// Self-signed certificate valid for `localhost` and `127.0.0.1`.
pub struct TestCert {
    pub cert_pem: String,
    pub key_pem: String,
}

impl TestCert {
    pub fn generate() -> Self {
        let CertifiedKey { cert, key_pair } =
            generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()])
                .expect("generate self-signed certificate");
        Self {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        }
    }

    pub fn server_tls(&self) -> ServerTls {
        ServerTls::from_pkcs8_pem(self.cert_pem.as_bytes(), self.key_pem.as_bytes())
            .expect("build server TLS")
    }

    /// The certificate as a client trust anchor.
    pub fn root(&self) -> Certificate {
        Certificate::from_pem(self.cert_pem.as_bytes()).expect("parse certificate")
    }
}
