//! TLS setup for the WebSocket connector
//!
//! Kubeconfig files carry PEM material in several shapes: CA bundles
//! with more than one certificate, and client keys in PKCS#8, PKCS#1
//! (`RSA PRIVATE KEY`) or SEC1 (`EC PRIVATE KEY`) form. native-tls only
//! takes one certificate per call and PKCS#8 keys, so the material is
//! normalized here first.

use native_tls::{Certificate, Identity, TlsConnector};

use ks_core::traits::TlsOptions;
use ks_core::ConnectionError;

const CERTIFICATE: &str = "CERTIFICATE";
const PKCS8_KEY: &str = "PRIVATE KEY";
const PKCS1_KEY: &str = "RSA PRIVATE KEY";
const SEC1_KEY: &str = "EC PRIVATE KEY";
const ENCRYPTED_KEY: &str = "ENCRYPTED PRIVATE KEY";

fn tls_error(message: String) -> ConnectionError {
    ConnectionError::Handshake(message)
}

/// Build the TLS connector from kubeconfig material
pub fn tls_connector(tls: &TlsOptions) -> Result<TlsConnector, ConnectionError> {
    let mut builder = TlsConnector::builder();

    if let Some(ca) = &tls.ca {
        for cert in ca_certificates(ca)? {
            builder.add_root_certificate(cert);
        }
    }

    if let (Some(cert), Some(key)) = (&tls.cert, &tls.key) {
        builder.identity(client_identity(cert, key)?);
    }

    if tls.skip_tls_verify {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }

    builder
        .build()
        .map_err(|e| tls_error(format!("TLS setup failed: {}", e)))
}

/// Every certificate in a PEM CA bundle
pub fn ca_certificates(bundle: &[u8]) -> Result<Vec<Certificate>, ConnectionError> {
    let text = std::str::from_utf8(bundle)
        .map_err(|_| tls_error("CA bundle is not PEM encoded".to_string()))?;

    let blocks = pem_blocks(text, CERTIFICATE);
    if blocks.is_empty() {
        return Err(tls_error("invalid CA certificate: no PEM certificate found".to_string()));
    }

    blocks
        .into_iter()
        .map(|block| {
            Certificate::from_pem(block.as_bytes())
                .map_err(|e| tls_error(format!("invalid CA certificate: {}", e)))
        })
        .collect()
}

/// Client identity from a PEM certificate chain and a PEM private key
pub fn client_identity(cert: &[u8], key: &[u8]) -> Result<Identity, ConnectionError> {
    let key = pkcs8_key(key)?;
    Identity::from_pkcs8(cert, key.as_bytes())
        .map_err(|e| tls_error(format!("invalid client identity: {}", e)))
}

/// Re-encode a PEM private key as PKCS#8
pub fn pkcs8_key(key: &[u8]) -> Result<String, ConnectionError> {
    let text = std::str::from_utf8(key)
        .map_err(|_| tls_error("client key is not PEM encoded".to_string()))?;

    if let Some(block) = pem_blocks(text, PKCS8_KEY).first() {
        return Ok(block.to_string());
    }
    if let Some(block) = pem_blocks(text, PKCS1_KEY).first() {
        return rsa_to_pkcs8(block);
    }
    if let Some(block) = pem_blocks(text, SEC1_KEY).first() {
        return ec_to_pkcs8(block);
    }
    if !pem_blocks(text, ENCRYPTED_KEY).is_empty() {
        return Err(tls_error(
            "unsupported client key format: encrypted PKCS#8".to_string(),
        ));
    }
    Err(tls_error(
        "unsupported client key format: expected PKCS#8, PKCS#1 RSA or SEC1 EC PEM".to_string(),
    ))
}

fn rsa_to_pkcs8(block: &str) -> Result<String, ConnectionError> {
    use rsa::pkcs1::DecodeRsaPrivateKey;
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};

    let key = rsa::RsaPrivateKey::from_pkcs1_pem(block)
        .map_err(|e| tls_error(format!("invalid PKCS#1 RSA client key: {}", e)))?;
    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| tls_error(format!("failed to re-encode RSA client key: {}", e)))?;
    Ok(pem.to_string())
}

fn ec_to_pkcs8(block: &str) -> Result<String, ConnectionError> {
    use p256::pkcs8::{EncodePrivateKey, LineEnding};

    let key = p256::SecretKey::from_sec1_pem(block).map_err(|_| {
        tls_error("unsupported client key format: only P-256 SEC1 EC keys are supported".to_string())
    })?;
    let pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| tls_error(format!("failed to re-encode EC client key: {}", e)))?;
    Ok(pem.to_string())
}

/// PEM blocks with the given label, in order of appearance
fn pem_blocks<'a>(text: &'a str, label: &str) -> Vec<&'a str> {
    let begin = format!("-----BEGIN {}-----", label);
    let end = format!("-----END {}-----", label);

    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(&begin) {
        let tail = &rest[start..];
        let Some(stop) = tail.find(&end) else {
            break;
        };
        let len = stop + end.len();
        blocks.push(&tail[..len]);
        rest = &tail[len..];
    }
    blocks
}
