//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

/// Load TLS configuration from PEM certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, std::io::Error> {
    if !cert_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Certificate file not found: {:?}", cert_path),
        ));
    }
    if !key_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Private key file not found: {:?}", key_path),
        ));
    }

    let certificates = count_certificates(cert_path)?;
    if certificates == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("No certificates in {:?}", cert_path),
        ));
    }
    tracing::debug!(cert = %cert_path.display(), certificates, "Loading TLS material");

    RustlsConfig::from_pem_file(cert_path, key_path).await
}

fn count_certificates(path: &Path) -> Result<usize, std::io::Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for certificate in rustls_pemfile::certs(&mut reader) {
        certificate?;
        count += 1;
    }
    Ok(count)
}
