//! Building and parsing the X.509 subject that carries an identity.

use const_oid::db::rfc4519::CN;
use der::Tag;
use der::asn1::Any;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::Identity;
use super::codec::{self, attribute_text};
use crate::error::{Result, TlsCaError};

impl Identity {
    /// Builds the certificate subject for this identity.
    ///
    /// The first RDN holds the username as the common name. Every other
    /// populated field follows in its own single-valued RDN, in registry order.
    ///
    /// # Errors
    ///
    /// Fails with [`TlsCaError::ValidationError`] for the same reasons as
    /// [`codec::encode`].
    pub fn subject(&self) -> Result<Name> {
        let attributes = codec::encode(self)?;

        let common_name = AttributeTypeAndValue {
            oid: CN,
            value: Any::new(Tag::Utf8String, self.username.as_bytes())
                .map_err(|e| TlsCaError::EncodingError(format!("common name: {e}")))?,
        };

        std::iter::once(common_name)
            .chain(attributes)
            .map(|attribute| {
                RelativeDistinguishedName::try_from(vec![attribute])
                    .map_err(|e| TlsCaError::EncodingError(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()
            .map(RdnSequence)
    }

    /// Recovers an identity from a certificate subject.
    ///
    /// Attributes may appear in any order and in multi-valued RDNs. The first
    /// common name becomes the username; `expires` is taken as given.
    ///
    /// # Errors
    ///
    /// Returns [`TlsCaError::DecodeError`] when the subject has no common
    /// name, or when [`codec::decode`] rejects an attribute.
    pub fn from_subject(subject: &Name, expires: OffsetDateTime) -> Result<Identity> {
        let attributes = || subject.0.iter().flat_map(|rdn| rdn.0.iter());

        let common_name = attributes()
            .find(|attribute| attribute.oid == CN)
            .ok_or_else(|| TlsCaError::DecodeError("subject has no common name".to_string()))?;
        let username = attribute_text("common name", &common_name.value)?.to_string();

        let identity = codec::decode(attributes().filter(|attribute| attribute.oid != CN), expires)?;
        Ok(Identity {
            username,
            ..identity
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::DeviceExtensions;
    use crate::identity::registry::IdentityField;
    use std::str::FromStr;

    fn llama() -> Identity {
        Identity {
            username: "llama".to_string(),
            groups: vec!["editor".to_string(), "viewer".to_string()],
            ..Identity::default()
        }
    }

    #[test]
    fn test_common_name_comes_first() {
        let subject = llama().subject().unwrap();
        assert_eq!(subject.0.len(), 2);

        let first = subject.0[0].0.get(0).unwrap();
        assert_eq!(first.oid, CN);
        assert_eq!(first.value.value(), b"llama");

        let second = subject.0[1].0.get(0).unwrap();
        assert_eq!(second.oid, IdentityField::Groups.oid());
    }

    #[test]
    fn test_device_extensions_round_trip() {
        let expires = OffsetDateTime::from_unix_timestamp(1_712_275_200).unwrap();
        let identity = Identity {
            device_extensions: Some(DeviceExtensions {
                device_id: "deviceid1".to_string(),
                asset_tag: "assettag2".to_string(),
                credential_id: "credentialid3".to_string(),
            }),
            expires,
            ..llama()
        };

        let subject = identity.subject().unwrap();
        let decoded = Identity::from_subject(&subject, expires).unwrap();
        assert_eq!(decoded, identity);
        assert_eq!(decoded.username, "llama");
        assert_eq!(decoded.groups, vec!["editor", "viewer"]);
    }

    #[test]
    fn test_missing_common_name_is_decode_error() {
        let subject = Name::from_str("O=editor").unwrap();
        assert!(matches!(
            Identity::from_subject(&subject, OffsetDateTime::UNIX_EPOCH),
            Err(TlsCaError::DecodeError(_))
        ));
    }

    #[test]
    fn test_multi_valued_rdn_decodes() {
        let identity = Identity {
            kubernetes_cluster: Some("kube-cluster".to_string()),
            ..llama()
        };
        let subject = identity.subject().unwrap();

        // Squash every attribute into a single RDN.
        let merged: Vec<_> = subject.0.iter().flat_map(|rdn| rdn.0.iter().cloned()).collect();
        let squashed = RdnSequence(vec![RelativeDistinguishedName::try_from(merged).unwrap()]);

        let decoded = Identity::from_subject(&squashed, identity.expires).unwrap();
        assert_eq!(decoded, identity);
    }

    #[test]
    fn test_attribute_order_does_not_matter() {
        let identity = Identity {
            teleport_cluster: Some("root".to_string()),
            renewable: true,
            ..llama()
        };
        let mut subject = identity.subject().unwrap();
        subject.0.reverse();

        let decoded = Identity::from_subject(&subject, identity.expires).unwrap();
        assert_eq!(decoded, identity);
    }

    #[test]
    fn test_foreign_subject_decodes_username_and_groups() {
        let subject = Name::from_str("CN=bob,O=ops,OU=unrelated").unwrap();
        let decoded = Identity::from_subject(&subject, OffsetDateTime::UNIX_EPOCH).unwrap();
        assert_eq!(decoded.username, "bob");
        assert_eq!(decoded.groups, vec!["ops"]);
    }

    #[test]
    fn test_invalid_identity_has_no_subject() {
        let identity = Identity {
            groups: Vec::new(),
            ..llama()
        };
        assert!(matches!(identity.subject(), Err(TlsCaError::ValidationError(_))));
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::identity::{AppCloudIdentity, DeviceExtensions, RouteToApp, RouteToDatabase};
    use proptest::prelude::*;

    fn arb_text() -> impl Strategy<Value = String> {
        "\\PC{0,16}"
    }

    fn arb_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[^,]{0,12}", 0..4)
    }

    fn arb_cloud_identity() -> impl Strategy<Value = AppCloudIdentity> {
        prop_oneof![
            arb_text().prop_map(AppCloudIdentity::Azure),
            arb_text().prop_map(AppCloudIdentity::Gcp),
        ]
    }

    fn arb_route_to_app() -> impl Strategy<Value = RouteToApp> {
        (
            arb_text(),
            arb_text(),
            arb_text(),
            prop::option::of(arb_cloud_identity()),
        )
            .prop_map(|(session_id, cluster_name, name, cloud_identity)| RouteToApp {
                session_id,
                cluster_name,
                name,
                cloud_identity,
            })
    }

    fn arb_route_to_database() -> impl Strategy<Value = RouteToDatabase> {
        (arb_text(), arb_text(), arb_text()).prop_map(|(service_name, protocol, username)| {
            RouteToDatabase {
                service_name,
                protocol,
                username,
            }
        })
    }

    fn arb_device_extensions() -> impl Strategy<Value = DeviceExtensions> {
        (arb_text(), arb_text(), arb_text()).prop_map(|(device_id, asset_tag, credential_id)| {
            DeviceExtensions {
                device_id,
                asset_tag,
                credential_id,
            }
        })
    }

    fn arb_identity() -> impl Strategy<Value = Identity> {
        let required = (
            "[a-z][a-z0-9._@-]{0,15}",
            prop::collection::vec("[^,]{0,12}", 1..4),
        );
        let optional = (
            prop::option::of(arb_text()),
            arb_list(),
            prop::option::of(arb_route_to_database()),
            arb_list(),
            arb_list(),
            arb_list(),
            arb_list(),
            prop::option::of(arb_text()),
            prop::option::of(arb_route_to_app()),
            arb_list(),
            arb_list(),
            prop::option::of(arb_text()),
        );
        let tail = (
            prop::option::of(arb_device_extensions()),
            any::<bool>(),
            any::<u64>(),
            any::<bool>(),
            0i64..4_000_000_000,
        );

        (required, optional, tail).prop_map(
            |(
                (username, groups),
                (
                    impersonator,
                    usage,
                    route_to_database,
                    database_names,
                    database_users,
                    kubernetes_groups,
                    kubernetes_users,
                    kubernetes_cluster,
                    route_to_app,
                    azure_identities,
                    gcp_service_accounts,
                    teleport_cluster,
                ),
                (device_extensions, renewable, generation, disallow_reissue, expires),
            )| Identity {
                username,
                groups,
                impersonator,
                usage,
                route_to_database,
                database_names,
                database_users,
                kubernetes_groups,
                kubernetes_users,
                kubernetes_cluster,
                route_to_app,
                azure_identities,
                gcp_service_accounts,
                teleport_cluster,
                device_extensions,
                renewable,
                generation,
                disallow_reissue,
                expires: OffsetDateTime::from_unix_timestamp(expires)
                    .unwrap_or(OffsetDateTime::UNIX_EPOCH),
            },
        )
    }

    proptest! {
        #[test]
        fn subject_round_trip(identity in arb_identity()) {
            let subject = identity.subject().unwrap();
            let decoded = Identity::from_subject(&subject, identity.expires).unwrap();
            prop_assert_eq!(decoded, identity);
        }

        #[test]
        fn subject_round_trip_survives_der(identity in arb_identity()) {
            use der::{Decode, Encode};

            let der = identity.subject().unwrap().to_der().unwrap();
            let subject = Name::from_der(&der).unwrap();
            let decoded = Identity::from_subject(&subject, identity.expires).unwrap();
            prop_assert_eq!(decoded, identity);
        }
    }
}
