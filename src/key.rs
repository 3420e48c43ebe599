//! Private key material and the signing seam used by the authority.

use der::Decode;
use ecdsa::signature::{SignatureEncoding, Signer};
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use p256::ecdsa::SigningKey as P256SigningKey;
use p384::ecdsa::SigningKey as P384SigningKey;
use pkcs8::{DecodePrivateKey, EncodePublicKey, PrivateKeyInfo};
use rsa::{RsaPrivateKey, RsaPublicKey, pkcs1::DecodeRsaPrivateKey};
use sha2::Sha256;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::SignatureAlgorithm;
use crate::error::{Result, TlsCaError};

/// Something that can sign certificates on behalf of an authority.
///
/// [`KeyPair`] implements this for in-memory keys. Keys held elsewhere (an
/// HSM, a KMS) plug in by implementing it too.
pub trait CertSigner: Send + Sync {
    /// The public half of the signing key.
    fn public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned>;

    /// The algorithm identifier written into `signatureAlgorithm`.
    fn signature_algorithm(&self) -> AlgorithmIdentifierOwned;

    /// Signs `message` and returns the encoded signature value.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Supported key types for certificate operations.
#[derive(Clone, Debug)]
pub enum KeyPair {
    Rsa(Box<RsaPrivateKey>),
    EcdsaP256(P256SigningKey),
    EcdsaP384(P384SigningKey),
    Ed25519(Ed25519SigningKey),
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| TlsCaError::KeyFormatError(e.to_string()))?;
        Ok(KeyPair::Rsa(Box::new(private)))
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        KeyPair::EcdsaP256(P256SigningKey::random(&mut rand_core::OsRng))
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        KeyPair::EcdsaP384(P384SigningKey::random(&mut rand_core::OsRng))
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        KeyPair::Ed25519(Ed25519SigningKey::generate(&mut rand_core::OsRng))
    }

    /// Imports a PKCS#8 `PrivateKeyInfo` of any supported algorithm.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = PrivateKeyInfo::try_from(der)
            .map_err(|e| TlsCaError::KeyFormatError(format!("malformed PKCS#8 key: {e}")))?;
        let key_error = |e: pkcs8::Error| TlsCaError::KeyFormatError(e.to_string());

        match info.algorithm.oid {
            const_oid::db::rfc5912::RSA_ENCRYPTION => Ok(KeyPair::Rsa(Box::new(
                RsaPrivateKey::from_pkcs8_der(der).map_err(key_error)?,
            ))),
            const_oid::db::rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = info
                    .algorithm
                    .parameters_oid()
                    .map_err(|e| TlsCaError::KeyFormatError(e.to_string()))?;
                match curve {
                    const_oid::db::rfc5912::SECP_256_R_1 => Ok(KeyPair::EcdsaP256(
                        P256SigningKey::from_pkcs8_der(der).map_err(key_error)?,
                    )),
                    const_oid::db::rfc5912::SECP_384_R_1 => Ok(KeyPair::EcdsaP384(
                        P384SigningKey::from_pkcs8_der(der).map_err(key_error)?,
                    )),
                    other => Err(TlsCaError::KeyFormatError(format!(
                        "unsupported elliptic curve {other}"
                    ))),
                }
            }
            const_oid::db::rfc8410::ID_ED_25519 => Ok(KeyPair::Ed25519(
                Ed25519SigningKey::from_pkcs8_der(der).map_err(key_error)?,
            )),
            other => Err(TlsCaError::KeyFormatError(format!(
                "unsupported key algorithm {other}"
            ))),
        }
    }

    /// Imports a SEC1 `ECPrivateKey`. The curve is inferred from the key size.
    fn from_sec1_der(der: &[u8]) -> Result<Self> {
        if let Ok(secret) = p256::SecretKey::from_sec1_der(der) {
            return Ok(KeyPair::EcdsaP256(secret.into()));
        }
        p384::SecretKey::from_sec1_der(der)
            .map(|secret| KeyPair::EcdsaP384(secret.into()))
            .map_err(|e| TlsCaError::KeyFormatError(format!("malformed EC private key: {e}")))
    }
}

/// Parses the first private key block out of `pem_bytes`.
///
/// Accepts PKCS#8 (`PRIVATE KEY`), PKCS#1 (`RSA PRIVATE KEY`) and SEC1
/// (`EC PRIVATE KEY`) blocks. Other blocks, such as certificates sitting in
/// the same file, are skipped.
pub fn parse_private_key_pem(pem_bytes: &[u8]) -> Result<KeyPair> {
    let blocks =
        pem::parse_many(pem_bytes).map_err(|e| TlsCaError::KeyFormatError(e.to_string()))?;

    for block in &blocks {
        match block.tag() {
            "PRIVATE KEY" => return KeyPair::from_pkcs8_der(block.contents()),
            "RSA PRIVATE KEY" => {
                let private = RsaPrivateKey::from_pkcs1_der(block.contents())
                    .map_err(|e| TlsCaError::KeyFormatError(e.to_string()))?;
                return Ok(KeyPair::Rsa(Box::new(private)));
            }
            "EC PRIVATE KEY" => return KeyPair::from_sec1_der(block.contents()),
            _ => continue,
        }
    }

    Err(TlsCaError::KeyFormatError(
        "no private key block found in PEM data".to_string(),
    ))
}

impl CertSigner for KeyPair {
    fn public_key_info(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let document = match self {
            KeyPair::Rsa(private) => RsaPublicKey::from(&**private).to_public_key_der(),
            KeyPair::EcdsaP256(signing_key) => signing_key.verifying_key().to_public_key_der(),
            KeyPair::EcdsaP384(signing_key) => signing_key.verifying_key().to_public_key_der(),
            KeyPair::Ed25519(signing_key) => signing_key.verifying_key().to_public_key_der(),
        }
        .map_err(|e| TlsCaError::EncodingError(e.to_string()))?;

        Ok(SubjectPublicKeyInfoOwned::from_der(document.as_bytes())?)
    }

    fn signature_algorithm(&self) -> AlgorithmIdentifierOwned {
        let algorithm = match self {
            KeyPair::Rsa(_) => SignatureAlgorithm::Sha256WithRsa,
            KeyPair::EcdsaP256(_) => SignatureAlgorithm::EcdsaWithSha256,
            KeyPair::EcdsaP384(_) => SignatureAlgorithm::EcdsaWithSha384,
            KeyPair::Ed25519(_) => SignatureAlgorithm::Ed25519,
        };
        algorithm.into()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signing_error = |e: ecdsa::signature::Error| TlsCaError::SigningError(e.to_string());

        match self {
            KeyPair::Rsa(private) => {
                let signing_key =
                    rsa::pkcs1v15::SigningKey::<Sha256>::new((**private).clone());
                let signature = signing_key.try_sign(message).map_err(signing_error)?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP256(signing_key) => {
                let signature: p256::ecdsa::Signature =
                    signing_key.try_sign(message).map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384(signing_key) => {
                let signature: p384::ecdsa::Signature =
                    signing_key.try_sign(message).map_err(signing_error)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519(signing_key) => {
                let signature = signing_key.try_sign(message).map_err(signing_error)?;
                Ok(signature.to_bytes().to_vec())
            }
        }
    }
}
