//! # tlsca - An Identity-Carrying Certificate Authority
//!
//! tlsca issues short-lived X.509 certificates whose subject carries a
//! structured authorization [`Identity`](identity::Identity): a user, their
//! roles, and the Kubernetes, database, application, cloud and device
//! context they are allowed to act in. Any service holding the CA
//! certificate can recover the identity from a presented certificate
//! without a round trip to the issuer.
//!
//! Everything is built on the RustCrypto stack. OpenSSL and Botan are
//! used only by the tests, to check interoperability.
//!
//! ## Supported Key Types
//!
//! - **RSA**: PKCS#1 v1.5 signatures with SHA-256
//! - **ECDSA**: P-256 and P-384 curves
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! CA keys are read from PKCS#8, PKCS#1 or SEC1 PEM. Other signers, such as
//! keys held in an HSM, plug in through [`CertSigner`](key::CertSigner).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tlsca::authority::CertAuthority;
//! use tlsca::cert::params::CertificateRequest;
//! use tlsca::cert::parse_certificate_pem;
//! use tlsca::identity::Identity;
//! use tlsca::key::{CertSigner, KeyPair};
//!
//! # fn main() -> Result<(), tlsca::error::TlsCaError> {
//! let ca = CertAuthority::from_keys(
//!     &std::fs::read("ca.pem").unwrap(),
//!     &std::fs::read("ca-key.pem").unwrap(),
//! )?;
//!
//! let identity = Identity {
//!     username: "alice".to_string(),
//!     groups: vec!["admin".to_string()],
//!     kubernetes_groups: vec!["system:masters".to_string()],
//!     ..Identity::default()
//! };
//!
//! let client_key = KeyPair::generate_ecdsa_p256();
//! let request = CertificateRequest::builder()
//!     .public_key(client_key.public_key_info()?)
//!     .subject(identity.subject()?)
//!     .not_after(time::OffsetDateTime::now_utc() + time::Duration::hours(12))
//!     .dns_names(vec!["localhost".to_string(), "127.0.0.1".to_string()])
//!     .build();
//! let cert_pem = ca.generate_certificate(&request)?;
//!
//! // Any holder of the certificate can read the identity back.
//! let decoded = parse_certificate_pem(&cert_pem)?.identity()?;
//! assert_eq!(decoded.kubernetes_groups, identity.kubernetes_groups);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::TlsCaError`]:
//!
//! ```rust
//! use tlsca::{error::TlsCaError, key::parse_private_key_pem};
//!
//! match parse_private_key_pem(b"invalid pem data") {
//!     Ok(_) => println!("Key imported successfully"),
//!     Err(TlsCaError::KeyFormatError(msg)) => println!("Bad key: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`identity`]: The identity record and its subject encoding
//! - [`authority`]: Loading a CA and issuing certificates
//! - [`cert`]: Certificate parsing, encoding and extensions
//! - [`key`]: Key generation, import and signing
//! - [`clock`]: Injectable time sources
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level certificate structure assembly

pub mod authority;
pub mod cert;
pub mod clock;
pub mod error;
pub mod identity;
pub mod key;
pub mod tbs_certificate;

pub use authority::{CertAuthority, TlsCertificate, generate_self_signed_ca};
pub use cert::params::CertificateRequest;
pub use cert::{ParsedCertificate, parse_certificate_pem};
pub use error::{Result, TlsCaError};
pub use identity::Identity;
