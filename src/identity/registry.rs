//! The table of object identifiers carried in an identity subject.
//!
//! This table is the wire contract with every service that decodes
//! certificates issued by this crate. Entries may be appended, but an OID
//! must never be reassigned to a different field: certificates issued by
//! older versions have to keep decoding to the same identity.

use const_oid::ObjectIdentifier;

/// How a field's value is written into its attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A single string.
    Text,
    /// A list of strings joined by [`LIST_DELIMITER`] into one attribute.
    TextList,
    /// A flag. The attribute is present only when the flag is set.
    Marker,
    /// An unsigned integer written as decimal text. Zero is not encoded.
    Counter,
}

/// Separator between the elements of a [`ValueKind::TextList`] attribute.
pub const LIST_DELIMITER: char = ',';

/// Value written for a [`ValueKind::Marker`] attribute.
pub const MARKER_VALUE: &str = "true";

/// Every identity field (or sub-record field) that is carried as a subject attribute.
///
/// The username is not listed here; it travels as the common name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityField {
    Groups,
    Usage,
    Impersonator,
    KubernetesUsers,
    KubernetesGroups,
    KubernetesCluster,
    TeleportCluster,
    AppSessionId,
    AppClusterName,
    AppName,
    AppAzureIdentity,
    AppGcpServiceAccount,
    AzureIdentities,
    GcpServiceAccounts,
    DatabaseServiceName,
    DatabaseProtocol,
    DatabaseUsername,
    DatabaseNames,
    DatabaseUsers,
    DeviceId,
    DeviceAssetTag,
    DeviceCredentialId,
    Renewable,
    Generation,
    DisallowReissue,
}

/// One row of the registry.
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    pub field: IdentityField,
    pub oid: ObjectIdentifier,
    pub kind: ValueKind,
    /// Short field name used in error messages and logs.
    pub name: &'static str,
}

const fn entry(
    field: IdentityField,
    oid: &str,
    kind: ValueKind,
    name: &'static str,
) -> RegistryEntry {
    RegistryEntry {
        field,
        oid: ObjectIdentifier::new_unwrap(oid),
        kind,
        name,
    }
}

/// Registered fields, in encoding order.
///
/// Arc `1.3.9999.1` holds application, Kubernetes, cluster and renewal
/// fields, `1.3.9999.2` database and impersonation fields, and `1.3.9999.3`
/// device trust. Groups use the standard organizationName attribute so
/// generic tooling shows them as `O=`.
#[rustfmt::skip]
pub static REGISTRY: [RegistryEntry; 25] = [
    entry(IdentityField::Groups, "2.5.4.10", ValueKind::TextList, "groups"),
    entry(IdentityField::KubernetesUsers, "1.3.9999.1.1", ValueKind::TextList, "kubernetes_users"),
    entry(IdentityField::KubernetesGroups, "1.3.9999.1.2", ValueKind::TextList, "kubernetes_groups"),
    entry(IdentityField::KubernetesCluster, "1.3.9999.1.3", ValueKind::Text, "kubernetes_cluster"),
    entry(IdentityField::AppSessionId, "1.3.9999.1.4", ValueKind::Text, "route_to_app.session_id"),
    entry(IdentityField::AppClusterName, "1.3.9999.1.6", ValueKind::Text, "route_to_app.cluster_name"),
    entry(IdentityField::TeleportCluster, "1.3.9999.1.7", ValueKind::Text, "teleport_cluster"),
    entry(IdentityField::AppName, "1.3.9999.1.10", ValueKind::Text, "route_to_app.name"),
    entry(IdentityField::Renewable, "1.3.9999.1.13", ValueKind::Marker, "renewable"),
    entry(IdentityField::Generation, "1.3.9999.1.14", ValueKind::Counter, "generation"),
    entry(IdentityField::AppAzureIdentity, "1.3.9999.1.16", ValueKind::Text, "route_to_app.azure_identity"),
    entry(IdentityField::AzureIdentities, "1.3.9999.1.17", ValueKind::TextList, "azure_identities"),
    entry(IdentityField::AppGcpServiceAccount, "1.3.9999.1.18", ValueKind::Text, "route_to_app.gcp_service_account"),
    entry(IdentityField::GcpServiceAccounts, "1.3.9999.1.19", ValueKind::TextList, "gcp_service_accounts"),
    entry(IdentityField::Usage, "1.3.9999.1.20", ValueKind::TextList, "usage"),
    entry(IdentityField::DatabaseServiceName, "1.3.9999.2.1", ValueKind::Text, "route_to_database.service_name"),
    entry(IdentityField::DatabaseProtocol, "1.3.9999.2.2", ValueKind::Text, "route_to_database.protocol"),
    entry(IdentityField::DatabaseUsername, "1.3.9999.2.3", ValueKind::Text, "route_to_database.username"),
    entry(IdentityField::DatabaseNames, "1.3.9999.2.5", ValueKind::TextList, "database_names"),
    entry(IdentityField::DatabaseUsers, "1.3.9999.2.6", ValueKind::TextList, "database_users"),
    entry(IdentityField::Impersonator, "1.3.9999.2.7", ValueKind::Text, "impersonator"),
    entry(IdentityField::DisallowReissue, "1.3.9999.2.9", ValueKind::Marker, "disallow_reissue"),
    entry(IdentityField::DeviceId, "1.3.9999.3.1", ValueKind::Text, "device_extensions.device_id"),
    entry(IdentityField::DeviceAssetTag, "1.3.9999.3.2", ValueKind::Text, "device_extensions.asset_tag"),
    entry(IdentityField::DeviceCredentialId, "1.3.9999.3.3", ValueKind::Text, "device_extensions.credential_id"),
];

impl IdentityField {
    /// All fields, in declaration order.
    pub const ALL: [IdentityField; 25] = [
        IdentityField::Groups,
        IdentityField::Usage,
        IdentityField::Impersonator,
        IdentityField::KubernetesUsers,
        IdentityField::KubernetesGroups,
        IdentityField::KubernetesCluster,
        IdentityField::TeleportCluster,
        IdentityField::AppSessionId,
        IdentityField::AppClusterName,
        IdentityField::AppName,
        IdentityField::AppAzureIdentity,
        IdentityField::AppGcpServiceAccount,
        IdentityField::AzureIdentities,
        IdentityField::GcpServiceAccounts,
        IdentityField::DatabaseServiceName,
        IdentityField::DatabaseProtocol,
        IdentityField::DatabaseUsername,
        IdentityField::DatabaseNames,
        IdentityField::DatabaseUsers,
        IdentityField::DeviceId,
        IdentityField::DeviceAssetTag,
        IdentityField::DeviceCredentialId,
        IdentityField::Renewable,
        IdentityField::Generation,
        IdentityField::DisallowReissue,
    ];

    /// Looks up the registry row for this field.
    pub fn entry(self) -> &'static RegistryEntry {
        REGISTRY
            .iter()
            .find(|entry| entry.field == self)
            .unwrap_or_else(|| unreachable!("{self:?} is missing from the registry"))
    }

    /// The OID this field is carried under.
    pub fn oid(self) -> ObjectIdentifier {
        self.entry().oid
    }

    /// How this field's value is encoded.
    pub fn kind(self) -> ValueKind {
        self.entry().kind
    }

    /// Short name for messages.
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// Routes an attribute OID to the field that owns it.
    ///
    /// Returns `None` for OIDs this version does not know about.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<IdentityField> {
        REGISTRY
            .iter()
            .find(|entry| &entry.oid == oid)
            .map(|entry| entry.field)
    }
}
