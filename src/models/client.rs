use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol family of a client artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientKind {
    OpenVPN,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientStatus {
    Active,
}

/// One client as seen by a single directory scan.
///
/// `id` is the 1-based position in that scan's sort order. It is a view
/// artifact, not a durable key: resolve id to name within one enumeration
/// and act on the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ClientKind,
    pub status: ClientStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedClients {
    pub total: usize,
    pub clients: Vec<ClientRecord>,
}

/// Which client directory a config lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    #[default]
    Vpn,
    Antizapret,
}

impl FromStr for ConfigType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vpn" => Ok(ConfigType::Vpn),
            "antizapret" => Ok(ConfigType::Antizapret),
            other => Err(format!("unknown config type '{}'", other)),
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigType::Vpn => f.write_str("vpn"),
            ConfigType::Antizapret => f.write_str("antizapret"),
        }
    }
}

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 10;

/// Raw query strings so malformed numbers fall back to defaults instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListClientsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListClientsQuery {
    pub fn page(&self) -> usize {
        positive_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    pub fn limit(&self) -> usize {
        positive_or(self.limit.as_deref(), DEFAULT_LIMIT)
    }
}

fn positive_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}

#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub expires_in: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigTypeQuery {
    #[serde(rename = "type")]
    pub config_type: Option<String>,
}

impl ConfigTypeQuery {
    pub fn config_type(&self) -> Result<ConfigType, String> {
        match self.config_type.as_deref() {
            None | Some("") => Ok(ConfigType::default()),
            Some(raw) => raw.parse(),
        }
    }
}
