use der::Encode;
use der::asn1::BitString;
use rand::RngCore;
use x509_cert::Version;
use x509_cert::certificate::{Certificate, TbsCertificateInner};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::params::{ExtensionParam, Validity};
use crate::cert::to_x509_time;
use crate::error::{Result, TlsCaError};
use crate::key::CertSigner;

/// Length in bytes of the serial numbers drawn by [`random_serial_number`].
pub const SERIAL_NUMBER_LEN: usize = 16;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The name of the certificate subject.
/// * `subject_public_key_info` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate.
#[derive(Debug, Clone)]
pub struct TbsCertificate {
    /// Big-endian, positive serial number
    pub serial_number: Vec<u8>,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(ExtensionParam::to_x509_extension)
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        let serial_number = SerialNumber::new(self.serial_number.as_slice())
            .map_err(|e| TlsCaError::EncodingError(format!("serial number: {e}")))?;

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.clone(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key_info.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            // An empty extensions field must be omitted, not encoded empty.
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_tbs_certificate_inner()?
            .to_der()
            .map_err(|e| TlsCaError::EncodingError(e.to_string()))
    }

    /// Signs the encoded TBS structure with `signer` and assembles the certificate.
    ///
    /// # Errors
    ///
    /// Returns [`TlsCaError::SigningError`] when `signer` fails, and
    /// [`TlsCaError::EncodingError`] when the structure cannot be encoded.
    pub fn sign(&self, signer: &dyn CertSigner) -> Result<Certificate> {
        let tbs_certificate = self.to_tbs_certificate_inner()?;
        let tbs_der = tbs_certificate
            .to_der()
            .map_err(|e| TlsCaError::EncodingError(e.to_string()))?;

        let signature = signer.sign(&tbs_der)?;

        Ok(Certificate {
            tbs_certificate,
            signature_algorithm: self.signature_algorithm.clone(),
            signature: BitString::from_bytes(&signature)
                .map_err(|e| TlsCaError::EncodingError(e.to_string()))?,
        })
    }
}

/// Draws a positive serial number of [`SERIAL_NUMBER_LEN`] bytes from `rng`.
pub fn random_serial_number<R: RngCore + ?Sized>(rng: &mut R) -> Vec<u8> {
    let mut serial = vec![0u8; SERIAL_NUMBER_LEN];
    rng.fill_bytes(&mut serial);
    // Clear the sign bit and keep the leading byte non-zero so the
    // encoding is always exactly SERIAL_NUMBER_LEN bytes.
    serial[0] = (serial[0] & 0x7f) | 0x40;
    serial
}
