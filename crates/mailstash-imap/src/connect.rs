//! TLS connection setup.

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use crate::Result;

/// The stream type produced by [`connect_tls`].
pub type TlsImapStream = TlsStream<TcpStream>;

/// Builds a TLS connector trusting the bundled webpki roots.
///
/// # Errors
///
/// Currently infallible; kept fallible for future client-auth support.
pub fn tls_connector() -> Result<TlsConnector> {
    let roots = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Connects to `host:port` with implicit TLS (IMAPS, typically port 993).
///
/// # Errors
///
/// Returns an error when the TCP connection or TLS handshake fails.
pub async fn connect_tls(host: &str, port: u16) -> Result<TlsStream<TcpStream>> {
    let tcp = TcpStream::connect((host, port)).await?;
    let connector = tls_connector()?;
    let server_name = ServerName::try_from(host.to_string())?;
    let stream = connector.connect(server_name, tcp).await?;
    debug!(host, port, "TLS connection established");
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_builds() {
        assert!(tls_connector().is_ok());
    }
}
