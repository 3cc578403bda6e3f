//! # X.509 Certificate Parsing
//!
//! Extracts the facts the proving flow needs from a Document Signer
//! Certificate (DSC) or Country Signing CA (CSCA) certificate: signature
//! scheme and hash, public key shape, key identifiers, and the raw TBS bytes
//! that become the certificate's tree leaf.
//!
//! Algorithms are matched by dotted OID. Anything outside the ICAO 9303
//! profile (RSA PKCS#1 v1.5, RSASSA-PSS, ECDSA over the NIST and Brainpool
//! curves) is rejected with `UnsupportedCertificateAlgorithm`.

use x509_parser::extensions::ParsedExtension;
use x509_parser::pem::parse_x509_pem;
use x509_parser::public_key::PublicKey;

use zkid_core::{CryptoError, HashAlgorithm, KeyIdentifier, SignatureAlgorithm};

/// Public key shape of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyDetails {
    Rsa { modulus_bits: u32, exponent: u64 },
    Ec { curve: String, bits: u32 },
}

impl PublicKeyDetails {
    /// Curve name or decimal exponent, as used in circuit names.
    pub fn curve_or_exponent(&self) -> String {
        match self {
            Self::Rsa { exponent, .. } => exponent.to_string(),
            Self::Ec { curve, .. } => curve.clone(),
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            Self::Rsa { modulus_bits, .. } => *modulus_bits,
            Self::Ec { bits, .. } => *bits,
        }
    }
}

/// The parsed facts of one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCertificate {
    pub signature_algorithm: SignatureAlgorithm,
    /// Hash of the certificate signature. `None` for RSASSA-PSS, whose hash
    /// is carried in the document metadata instead.
    pub hash_algorithm: Option<HashAlgorithm>,
    pub public_key: PublicKeyDetails,
    pub subject: String,
    pub subject_key_identifier: Option<KeyIdentifier>,
    pub authority_key_identifier: Option<KeyIdentifier>,
    /// DER of the `tbsCertificate`.
    pub tbs_bytes: Vec<u8>,
    pub pem: String,
}

// ─── OID tables ──────────────────────────────────────────────────────

fn signature_scheme(oid: &str) -> Option<(SignatureAlgorithm, Option<HashAlgorithm>)> {
    use HashAlgorithm::*;
    use SignatureAlgorithm::*;
    let scheme = match oid {
        "1.2.840.113549.1.1.5" => (Rsa, Some(Sha1)),
        "1.2.840.113549.1.1.14" => (Rsa, Some(Sha224)),
        "1.2.840.113549.1.1.11" => (Rsa, Some(Sha256)),
        "1.2.840.113549.1.1.12" => (Rsa, Some(Sha384)),
        "1.2.840.113549.1.1.13" => (Rsa, Some(Sha512)),
        "1.2.840.113549.1.1.10" => (RsaPss, None),
        "1.2.840.10045.4.1" => (Ecdsa, Some(Sha1)),
        "1.2.840.10045.4.3.1" => (Ecdsa, Some(Sha224)),
        "1.2.840.10045.4.3.2" => (Ecdsa, Some(Sha256)),
        "1.2.840.10045.4.3.3" => (Ecdsa, Some(Sha384)),
        "1.2.840.10045.4.3.4" => (Ecdsa, Some(Sha512)),
        _ => return None,
    };
    Some(scheme)
}

fn named_curve(oid: &str) -> Option<(&'static str, u32)> {
    let curve = match oid {
        "1.3.132.0.33" => ("secp224r1", 224),
        "1.2.840.10045.3.1.7" => ("secp256r1", 256),
        "1.3.132.0.34" => ("secp384r1", 384),
        "1.3.132.0.35" => ("secp521r1", 521),
        "1.3.36.3.3.2.8.1.1.5" => ("brainpoolP224r1", 224),
        "1.3.36.3.3.2.8.1.1.7" => ("brainpoolP256r1", 256),
        "1.3.36.3.3.2.8.1.1.11" => ("brainpoolP384r1", 384),
        "1.3.36.3.3.2.8.1.1.13" => ("brainpoolP512r1", 512),
        _ => return None,
    };
    Some(curve)
}

// ─── Parsing ─────────────────────────────────────────────────────────

/// Parse a PEM-encoded certificate.
pub fn parse_certificate(pem: &str) -> Result<ParsedCertificate, CryptoError> {
    let (_, block) = parse_x509_pem(pem.as_bytes())
        .map_err(|e| CryptoError::CertificateParse(format!("invalid PEM: {e}")))?;
    let cert = block
        .parse_x509()
        .map_err(|e| CryptoError::CertificateParse(format!("invalid DER: {e}")))?;

    let sig_oid = cert.signature_algorithm.algorithm.to_id_string();
    let (signature_algorithm, hash_algorithm) = signature_scheme(&sig_oid).ok_or_else(|| {
        CryptoError::UnsupportedCertificateAlgorithm(format!("signature algorithm {sig_oid}"))
    })?;

    let spki = cert.public_key();
    let parsed_key = spki
        .parsed()
        .map_err(|e| CryptoError::CertificateParse(format!("public key: {e}")))?;
    let public_key = match parsed_key {
        PublicKey::RSA(rsa) => {
            let exponent = rsa
                .try_exponent()
                .map_err(|e| CryptoError::CertificateParse(format!("RSA exponent: {e}")))?;
            PublicKeyDetails::Rsa {
                modulus_bits: rsa.key_size() as u32,
                exponent,
            }
        }
        PublicKey::EC(_) => {
            let curve_oid = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|p| p.as_oid().ok())
                .map(|oid| oid.to_id_string())
                .ok_or_else(|| {
                    CryptoError::UnsupportedCertificateAlgorithm(
                        "EC key without a named curve".to_string(),
                    )
                })?;
            let (curve, bits) = named_curve(&curve_oid).ok_or_else(|| {
                CryptoError::UnsupportedCertificateAlgorithm(format!("curve {curve_oid}"))
            })?;
            PublicKeyDetails::Ec {
                curve: curve.to_string(),
                bits,
            }
        }
        _ => {
            return Err(CryptoError::UnsupportedCertificateAlgorithm(format!(
                "public key algorithm {}",
                spki.algorithm.algorithm.to_id_string()
            )))
        }
    };

    let mut subject_key_identifier = None;
    let mut authority_key_identifier = None;
    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::SubjectKeyIdentifier(ski) => {
                subject_key_identifier = Some(KeyIdentifier::from_bytes(ski.0));
            }
            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                authority_key_identifier = aki
                    .key_identifier
                    .as_ref()
                    .map(|id| KeyIdentifier::from_bytes(id.0));
            }
            _ => {}
        }
    }

    Ok(ParsedCertificate {
        signature_algorithm,
        hash_algorithm,
        public_key,
        subject: cert.subject().to_string(),
        subject_key_identifier,
        authority_key_identifier,
        tbs_bytes: cert.tbs_certificate.as_ref().to_vec(),
        pem: pem.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSCA_RSA: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/certs/csca_rsa.pem"
    ));
    const CSCA_EC: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/certs/csca_ec.pem"
    ));
    const DSC_EC: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/certs/dsc_ec.pem"
    ));
    const DSC_PSS: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/certs/dsc_rsapss.pem"
    ));

    #[test]
    fn test_rsa_csca() {
        let cert = parse_certificate(CSCA_RSA).unwrap();
        assert_eq!(cert.signature_algorithm, SignatureAlgorithm::Rsa);
        assert_eq!(cert.hash_algorithm, Some(HashAlgorithm::Sha256));
        assert_eq!(
            cert.public_key,
            PublicKeyDetails::Rsa {
                modulus_bits: 2048,
                exponent: 65537
            }
        );
        assert_eq!(cert.public_key.curve_or_exponent(), "65537");
        assert_eq!(
            cert.subject_key_identifier.as_ref().map(KeyIdentifier::as_str),
            Some("8050cf235766a968c37ef4b9cd4a52f6936d4c59")
        );
        assert!(!cert.tbs_bytes.is_empty());
    }

    #[test]
    fn test_ec_csca_reports_curve() {
        let cert = parse_certificate(CSCA_EC).unwrap();
        assert_eq!(cert.signature_algorithm, SignatureAlgorithm::Ecdsa);
        assert_eq!(cert.hash_algorithm, Some(HashAlgorithm::Sha384));
        assert_eq!(
            cert.public_key,
            PublicKeyDetails::Ec {
                curve: "secp384r1".into(),
                bits: 384
            }
        );
    }

    #[test]
    fn test_dsc_authority_key_matches_issuer() {
        let csca = parse_certificate(CSCA_RSA).unwrap();
        let dsc = parse_certificate(DSC_EC).unwrap();
        assert_eq!(dsc.authority_key_identifier, csca.subject_key_identifier);
        assert_eq!(dsc.public_key.curve_or_exponent(), "secp256r1");
        assert_eq!(dsc.public_key.bits(), 256);
    }

    #[test]
    fn test_pss_has_no_certificate_hash() {
        let dsc = parse_certificate(DSC_PSS).unwrap();
        assert_eq!(dsc.signature_algorithm, SignatureAlgorithm::RsaPss);
        assert_eq!(dsc.hash_algorithm, None);
    }

    #[test]
    fn test_malformed_input_is_parse_error() {
        assert!(matches!(
            parse_certificate("not a certificate"),
            Err(CryptoError::CertificateParse(_))
        ));
        let truncated = "-----BEGIN CERTIFICATE-----\nMIIBIjANBgkq\n-----END CERTIFICATE-----\n";
        assert!(matches!(
            parse_certificate(truncated),
            Err(CryptoError::CertificateParse(_))
        ));
    }

    #[test]
    fn test_parsing_is_deterministic() {
        assert_eq!(
            parse_certificate(DSC_EC).unwrap(),
            parse_certificate(DSC_EC).unwrap()
        );
    }
}
