//! Conversion between an [`Identity`] and the subject attributes that carry it.
//!
//! Every populated field becomes one `UTF8String` attribute under the OID
//! the [`registry`](super::registry) assigns to it. Decoding is the
//! inverse, and it ignores attributes it does not recognize so that
//! certificates minted by newer issuers still decode.

use der::asn1::Any;
use der::{Tag, Tagged};
use time::OffsetDateTime;
use tracing::trace;
use x509_cert::attr::AttributeTypeAndValue;

use super::registry::{IdentityField, LIST_DELIMITER, MARKER_VALUE, REGISTRY, ValueKind};
use super::{AppCloudIdentity, Identity};
use crate::error::{Result, TlsCaError};

/// Encodes every populated field of `identity` as a subject attribute, in registry order.
///
/// The username is not part of the output; it travels as the common name.
///
/// # Errors
///
/// Returns [`TlsCaError::ValidationError`] when the username or the group
/// list is empty, or when a list element contains [`LIST_DELIMITER`].
pub fn encode(identity: &Identity) -> Result<Vec<AttributeTypeAndValue>> {
    validate(identity)?;

    let mut attributes = Vec::new();
    for entry in REGISTRY.iter() {
        if let Some(value) = encoded_value(identity, entry.field) {
            attributes.push(AttributeTypeAndValue {
                oid: entry.oid,
                value: Any::new(Tag::Utf8String, value.into_bytes()).map_err(|e| {
                    TlsCaError::EncodingError(format!("{}: {e}", entry.name))
                })?,
            });
        }
    }
    Ok(attributes)
}

/// Rebuilds an identity from subject attributes.
///
/// `expires` is copied into the result as is. The username is left empty.
///
/// # Errors
///
/// Returns [`TlsCaError::DecodeError`] when a recognized attribute does not
/// hold a string, when the generation is not a decimal number, or when an
/// app route names both an Azure identity and a GCP service account.
pub fn decode<'a, I>(attributes: I, expires: OffsetDateTime) -> Result<Identity>
where
    I: IntoIterator<Item = &'a AttributeTypeAndValue>,
{
    let mut identity = Identity {
        expires,
        ..Identity::default()
    };
    let mut azure_identity = None;
    let mut gcp_service_account = None;

    for attribute in attributes {
        let Some(field) = IdentityField::from_oid(&attribute.oid) else {
            trace!(oid = %attribute.oid, "skipping unrecognized subject attribute");
            continue;
        };
        let value = attribute_text(field.name(), &attribute.value)?;

        match field.kind() {
            ValueKind::TextList => list_mut(&mut identity, field)
                .extend(value.split(LIST_DELIMITER).map(String::from)),
            ValueKind::Marker => match field {
                IdentityField::Renewable => identity.renewable = true,
                _ => identity.disallow_reissue = true,
            },
            ValueKind::Counter => {
                identity.generation = value.parse().map_err(|_| {
                    TlsCaError::DecodeError(format!(
                        "{}: {value:?} is not a decimal number",
                        field.name()
                    ))
                })?;
            }
            ValueKind::Text => match field {
                IdentityField::AppAzureIdentity => {
                    identity.route_to_app.get_or_insert_with(Default::default);
                    azure_identity = Some(value.to_string());
                }
                IdentityField::AppGcpServiceAccount => {
                    identity.route_to_app.get_or_insert_with(Default::default);
                    gcp_service_account = Some(value.to_string());
                }
                _ => *text_mut(&mut identity, field) = value.to_string(),
            },
        }
    }

    let cloud_identity = match (azure_identity, gcp_service_account) {
        (Some(_), Some(_)) => {
            return Err(TlsCaError::DecodeError(
                "app route carries both an Azure identity and a GCP service account".to_string(),
            ));
        }
        (Some(azure), None) => Some(AppCloudIdentity::Azure(azure)),
        (None, Some(gcp)) => Some(AppCloudIdentity::Gcp(gcp)),
        (None, None) => None,
    };
    if let Some(app) = identity.route_to_app.as_mut() {
        app.cloud_identity = cloud_identity;
    }

    Ok(identity)
}

impl Identity {
    /// Encodes this identity as subject attributes. See [`encode`].
    pub fn to_attributes(&self) -> Result<Vec<AttributeTypeAndValue>> {
        encode(self)
    }

    /// Decodes an identity from subject attributes. See [`decode`].
    pub fn from_attributes<'a, I>(attributes: I, expires: OffsetDateTime) -> Result<Identity>
    where
        I: IntoIterator<Item = &'a AttributeTypeAndValue>,
    {
        decode(attributes, expires)
    }
}

fn validate(identity: &Identity) -> Result<()> {
    if identity.username.is_empty() {
        return Err(TlsCaError::ValidationError("username is empty".to_string()));
    }
    if identity.groups.is_empty() {
        return Err(TlsCaError::ValidationError(
            "at least one group is required".to_string(),
        ));
    }
    for field in IdentityField::ALL {
        if field.kind() != ValueKind::TextList {
            continue;
        }
        if let Some(element) = list(identity, field)
            .iter()
            .find(|element| element.contains(LIST_DELIMITER))
        {
            return Err(TlsCaError::ValidationError(format!(
                "{}: {element:?} contains the list delimiter {LIST_DELIMITER:?}",
                field.name()
            )));
        }
    }
    Ok(())
}

/// The text written for `field`, or `None` when the field is unset.
fn encoded_value(identity: &Identity, field: IdentityField) -> Option<String> {
    match field.kind() {
        ValueKind::TextList => {
            let values = list(identity, field);
            (!values.is_empty()).then(|| values.join(String::from(LIST_DELIMITER).as_str()))
        }
        ValueKind::Marker => {
            let set = match field {
                IdentityField::Renewable => identity.renewable,
                _ => identity.disallow_reissue,
            };
            set.then(|| MARKER_VALUE.to_string())
        }
        ValueKind::Counter => (identity.generation > 0).then(|| identity.generation.to_string()),
        ValueKind::Text => text(identity, field).map(str::to_string),
    }
}

fn list(identity: &Identity, field: IdentityField) -> &[String] {
    match field {
        IdentityField::Groups => &identity.groups,
        IdentityField::Usage => &identity.usage,
        IdentityField::KubernetesUsers => &identity.kubernetes_users,
        IdentityField::KubernetesGroups => &identity.kubernetes_groups,
        IdentityField::AzureIdentities => &identity.azure_identities,
        IdentityField::GcpServiceAccounts => &identity.gcp_service_accounts,
        IdentityField::DatabaseNames => &identity.database_names,
        IdentityField::DatabaseUsers => &identity.database_users,
        _ => &[],
    }
}

fn list_mut(identity: &mut Identity, field: IdentityField) -> &mut Vec<String> {
    match field {
        IdentityField::Groups => &mut identity.groups,
        IdentityField::Usage => &mut identity.usage,
        IdentityField::KubernetesUsers => &mut identity.kubernetes_users,
        IdentityField::KubernetesGroups => &mut identity.kubernetes_groups,
        IdentityField::AzureIdentities => &mut identity.azure_identities,
        IdentityField::GcpServiceAccounts => &mut identity.gcp_service_accounts,
        IdentityField::DatabaseNames => &mut identity.database_names,
        IdentityField::DatabaseUsers => &mut identity.database_users,
        _ => unreachable!("{field:?} is not a list field"),
    }
}

fn text(identity: &Identity, field: IdentityField) -> Option<&str> {
    let database = identity.route_to_database.as_ref();
    let app = identity.route_to_app.as_ref();
    let device = identity.device_extensions.as_ref();
    let cloud = app.and_then(|app| app.cloud_identity.as_ref());

    match field {
        IdentityField::Impersonator => identity.impersonator.as_deref(),
        IdentityField::KubernetesCluster => identity.kubernetes_cluster.as_deref(),
        IdentityField::TeleportCluster => identity.teleport_cluster.as_deref(),
        IdentityField::AppSessionId => app.map(|app| app.session_id.as_str()),
        IdentityField::AppClusterName => app.map(|app| app.cluster_name.as_str()),
        IdentityField::AppName => app.map(|app| app.name.as_str()),
        IdentityField::AppAzureIdentity => match cloud {
            Some(AppCloudIdentity::Azure(id)) => Some(id.as_str()),
            _ => None,
        },
        IdentityField::AppGcpServiceAccount => match cloud {
            Some(AppCloudIdentity::Gcp(account)) => Some(account.as_str()),
            _ => None,
        },
        IdentityField::DatabaseServiceName => database.map(|db| db.service_name.as_str()),
        IdentityField::DatabaseProtocol => database.map(|db| db.protocol.as_str()),
        IdentityField::DatabaseUsername => database.map(|db| db.username.as_str()),
        IdentityField::DeviceId => device.map(|device| device.device_id.as_str()),
        IdentityField::DeviceAssetTag => device.map(|device| device.asset_tag.as_str()),
        IdentityField::DeviceCredentialId => device.map(|device| device.credential_id.as_str()),
        _ => None,
    }
}

/// The slot a decoded text value is stored in. Sub-records are created on first use.
fn text_mut(identity: &mut Identity, field: IdentityField) -> &mut String {
    match field {
        IdentityField::Impersonator => identity.impersonator.get_or_insert_with(String::new),
        IdentityField::KubernetesCluster => {
            identity.kubernetes_cluster.get_or_insert_with(String::new)
        }
        IdentityField::TeleportCluster => identity.teleport_cluster.get_or_insert_with(String::new),
        IdentityField::AppSessionId => {
            &mut identity.route_to_app.get_or_insert_with(Default::default).session_id
        }
        IdentityField::AppClusterName => {
            &mut identity.route_to_app.get_or_insert_with(Default::default).cluster_name
        }
        IdentityField::AppName => &mut identity.route_to_app.get_or_insert_with(Default::default).name,
        IdentityField::DatabaseServiceName => {
            &mut identity.route_to_database.get_or_insert_with(Default::default).service_name
        }
        IdentityField::DatabaseProtocol => {
            &mut identity.route_to_database.get_or_insert_with(Default::default).protocol
        }
        IdentityField::DatabaseUsername => {
            &mut identity.route_to_database.get_or_insert_with(Default::default).username
        }
        IdentityField::DeviceId => {
            &mut identity.device_extensions.get_or_insert_with(Default::default).device_id
        }
        IdentityField::DeviceAssetTag => {
            &mut identity.device_extensions.get_or_insert_with(Default::default).asset_tag
        }
        IdentityField::DeviceCredentialId => {
            &mut identity.device_extensions.get_or_insert_with(Default::default).credential_id
        }
        _ => unreachable!("{field:?} is not a plain text field"),
    }
}

/// Reads the string held by an attribute value. `name` labels errors.
pub(crate) fn attribute_text<'a>(name: &str, value: &'a Any) -> Result<&'a str> {
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String => {
            std::str::from_utf8(value.value()).map_err(|e| {
                TlsCaError::DecodeError(format!("{name}: invalid string value: {e}"))
            })
        }
        other => Err(TlsCaError::DecodeError(format!(
            "{name}: expected a string value, found {other}"
        ))),
    }
}
