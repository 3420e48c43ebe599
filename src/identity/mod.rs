//! The authorization identity carried inside a certificate subject.
//!
//! An [`Identity`] is turned into a subject with [`Identity::subject`] and
//! recovered from one with [`Identity::from_subject`]. The mapping between
//! fields and subject attributes lives in [`registry`]; the encoding rules
//! live in [`codec`].

pub mod codec;
pub mod registry;
pub mod subject;

use time::OffsetDateTime;

/// Routing information for a certificate scoped to a single database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteToDatabase {
    /// Name of the database service the certificate targets.
    pub service_name: String,
    /// Wire protocol spoken by the database, e.g. `postgres`.
    pub protocol: String,
    /// Database account to log in as.
    pub username: String,
}

/// A cloud identity an application session should assume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCloudIdentity {
    /// An Azure managed identity.
    Azure(String),
    /// A GCP service account.
    Gcp(String),
}

/// Routing information for an application access certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteToApp {
    pub session_id: String,
    pub cluster_name: String,
    pub name: String,
    pub cloud_identity: Option<AppCloudIdentity>,
}

/// Device trust attributes binding a certificate to an enrolled device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceExtensions {
    pub device_id: String,
    pub asset_tag: String,
    pub credential_id: String,
}

/// The authorization record carried by a certificate.
///
/// Only `username` and `groups` are required. Optional strings and
/// sub-records are `None` when unset and lists are empty when unset.
/// `expires` never travels in the subject; callers pass it back in when
/// decoding, usually taken from the certificate's `notAfter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub groups: Vec<String>,
    /// Set when the certificate was requested by someone other than `username`.
    pub impersonator: Option<String>,
    /// Restricts the certificate to specific protocols. Empty means unrestricted.
    pub usage: Vec<String>,
    pub route_to_database: Option<RouteToDatabase>,
    pub database_names: Vec<String>,
    pub database_users: Vec<String>,
    pub kubernetes_groups: Vec<String>,
    pub kubernetes_users: Vec<String>,
    pub kubernetes_cluster: Option<String>,
    pub route_to_app: Option<RouteToApp>,
    pub azure_identities: Vec<String>,
    pub gcp_service_accounts: Vec<String>,
    /// Name of the cluster that issued the certificate.
    pub teleport_cluster: Option<String>,
    pub device_extensions: Option<DeviceExtensions>,
    /// The certificate may be used to request a renewed certificate.
    pub renewable: bool,
    /// Number of times a renewable certificate has been renewed. Zero means unset.
    pub generation: u64,
    /// The certificate must not be used to obtain further certificates.
    pub disallow_reissue: bool,
    pub expires: OffsetDateTime,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            username: String::new(),
            groups: Vec::new(),
            impersonator: None,
            usage: Vec::new(),
            route_to_database: None,
            database_names: Vec::new(),
            database_users: Vec::new(),
            kubernetes_groups: Vec::new(),
            kubernetes_users: Vec::new(),
            kubernetes_cluster: None,
            route_to_app: None,
            azure_identities: Vec::new(),
            gcp_service_accounts: Vec::new(),
            teleport_cluster: None,
            device_extensions: None,
            renewable: false,
            generation: 0,
            disallow_reissue: false,
            expires: OffsetDateTime::UNIX_EPOCH,
        }
    }
}
