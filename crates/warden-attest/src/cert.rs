//! Certificate extraction from raw onboarding payloads
//!
//! The payload is not guaranteed to begin at the certificate: framing bytes
//! may come first. The certificate is taken to start at the first ASN.1
//! SEQUENCE tag and to run to the end of the payload. A `0x30` that happens to
//! sit inside the framing is rejected by the X.509 parse.

use base64::{engine::general_purpose, Engine as _};
use x509_parser::parse_x509_certificate;

use crate::error::AttestError;

/// ASN.1 SEQUENCE tag, the first byte of every DER certificate
pub const DER_SEQUENCE_TAG: u8 = 0x30;

const PEM_LINE_WIDTH: usize = 64;

/// Slice the payload from the first SEQUENCE tag to the end
pub fn locate_der(raw: &[u8]) -> Result<&[u8], AttestError> {
    raw.iter()
        .position(|&b| b == DER_SEQUENCE_TAG)
        .map(|idx| &raw[idx..])
        .ok_or(AttestError::CertificateNotFound)
}

/// Parse candidate DER bytes as a single X.509 certificate
///
/// Trailing bytes after the certificate are an error.
pub fn parse_certificate(der: &[u8]) -> Result<&[u8], AttestError> {
    let (rest, cert) =
        parse_x509_certificate(der).map_err(|e| AttestError::CertificateParse(e.to_string()))?;
    if !rest.is_empty() {
        return Err(AttestError::CertificateParse(format!(
            "{} trailing bytes after certificate",
            rest.len()
        )));
    }
    tracing::trace!(subject = %cert.subject(), "Parsed device certificate");
    Ok(der)
}

/// Wrap DER bytes in a `CERTIFICATE` PEM envelope, without trailing newline
pub fn encode_pem(der: &[u8]) -> String {
    let body = general_purpose::STANDARD.encode(der);
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    // Base64 output is ASCII, so every byte offset is a char boundary
    for start in (0..body.len()).step_by(PEM_LINE_WIDTH) {
        let end = (start + PEM_LINE_WIDTH).min(body.len());
        pem.push_str(&body[start..end]);
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----");
    pem
}

/// Locate, parse, and re-encode the certificate carried by a payload
pub fn extract_certificate_pem(raw: &[u8]) -> Result<String, AttestError> {
    let der = parse_certificate(locate_der(raw)?)?;
    Ok(encode_pem(der).trim().to_string())
}
