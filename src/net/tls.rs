//! TLS configuration and certificate loading.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsSpec;

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(tls: &TlsSpec) -> Result<RustlsConfig, std::io::Error> {
    ensure_exists(&tls.cert_path, "Certificate")?;
    ensure_exists(&tls.key_path, "Private key")?;

    RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await
}

fn ensure_exists(path: &Path, what: &str) -> Result<(), std::io::Error> {
    if path.exists() {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} file not found: {:?}", what, path),
        ))
    }
}
