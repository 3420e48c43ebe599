use std::sync::Arc;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Tag;
use der::asn1::{Any, OctetString};
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use super::extensions::ToAndFromX509Extension;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TlsCaError};

/// Parameters for a certificate issued by a [`CertAuthority`](crate::authority::CertAuthority).
///
/// # Fields
/// * `clock` - Source of the issuance time. Defaults to the system clock.
/// * `public_key` - The public key being certified.
/// * `subject` - The subject name, usually from [`Identity::subject`](crate::identity::Identity::subject).
/// * `not_after` - The end of the validity period.
/// * `dns_names` - Subject alternative names. IP literals become IP address entries.
/// * `usages` - Extended key usages. Defaults to server and client authentication.
#[derive(Clone, Debug, Builder)]
pub struct CertificateRequest {
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    pub clock: Arc<dyn Clock>,
    pub public_key: SubjectPublicKeyInfoOwned,
    pub subject: Name,
    pub not_after: OffsetDateTime,
    #[builder(default)]
    pub dns_names: Vec<String>,
    #[builder(default = vec![ExtendedKeyUsageOption::ServerAuth, ExtendedKeyUsageOption::ClientAuth])]
    pub usages: Vec<ExtendedKeyUsageOption>,
}

/// Distinguished name parameters for a CA certificate.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 name.
    ///
    /// Attributes are written in the order O, OU, CN, one per RDN.
    pub fn as_x509_name(&self) -> Result<Name> {
        use const_oid::db::rfc4519::{CN, O, OU};

        [
            (O, self.organization.as_deref()),
            (OU, self.organization_unit.as_deref()),
            (CN, Some(self.common_name.as_str())),
        ]
        .into_iter()
        .filter_map(|(oid, value)| value.map(|value| (oid, value)))
        .map(|(oid, value)| {
            let attribute = AttributeTypeAndValue {
                oid,
                value: Any::new(Tag::Utf8String, value.as_bytes())?,
            };
            RelativeDistinguishedName::try_from(vec![attribute])
        })
        .collect::<der::Result<Vec<_>>>()
        .map(RdnSequence)
        .map_err(|e| TlsCaError::EncodingError(e.to_string()))
    }
}

/// Certificate validity period.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// A window from `now` until `not_after`, both truncated to whole seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TlsCaError::SigningError`] when `not_after` is not strictly
    /// after `now`, or when the truncated window is empty.
    pub fn starting_at(now: OffsetDateTime, not_after: OffsetDateTime) -> Result<Self> {
        if not_after <= now {
            return Err(TlsCaError::SigningError(format!(
                "not_after {not_after} is not after the issuance time {now}"
            )));
        }

        let not_before = whole_seconds(now);
        let not_after = whole_seconds(not_after);
        if not_after <= not_before {
            return Err(TlsCaError::SigningError(format!(
                "validity window {not_before} .. {not_after} is empty at second precision"
            )));
        }
        Ok(Self {
            not_before,
            not_after,
        })
    }
}

fn whole_seconds(instant: OffsetDateTime) -> OffsetDateTime {
    instant.replace_nanosecond(0).unwrap_or(instant)
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: &E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }

    /// Converts to the x509-cert representation.
    pub fn to_x509_extension(&self) -> Result<x509_cert::ext::Extension> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: OctetString::new(self.value.clone())
                .map_err(|e| TlsCaError::EncodingError(e.to_string()))?,
        })
    }
}
