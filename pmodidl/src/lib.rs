//! # pmodidl - DIDL-Lite
//!
//! Structures et utilitaires pour le format DIDL-Lite utilisé dans les
//! réponses ContentDirectory UPnP/DLNA.
//!
//! The structures serialize with `quick-xml` and deserialize the same way, so
//! a Browse `Result` built by the server can be parsed back by tests or by a
//! control point.

use serde::{Deserialize, Serialize};

pub const DIDL_NAMESPACE: &str = "urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/";
pub const UPNP_NAMESPACE: &str = "urn:schemas-upnp-org:metadata-1-0/upnp/";
pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
pub const DLNA_NAMESPACE: &str = "urn:schemas-dlna-org:metadata-1-0/";

/// Classe UPnP des containers exposés
pub const CONTAINER_CLASS: &str = "object.container";

/// Racine d'un document DIDL-Lite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "DIDL-Lite")]
pub struct DIDLLite {
    #[serde(rename = "@xmlns")]
    pub xmlns: String,

    #[serde(rename = "@xmlns:upnp", skip_serializing_if = "Option::is_none")]
    pub xmlns_upnp: Option<String>,

    #[serde(rename = "@xmlns:dc", skip_serializing_if = "Option::is_none")]
    pub xmlns_dc: Option<String>,

    #[serde(rename = "@xmlns:dlna", skip_serializing_if = "Option::is_none")]
    pub xmlns_dlna: Option<String>,

    #[serde(rename = "container", default)]
    pub containers: Vec<Container>,

    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

/// Container (dossier ou groupe de contenu)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "@restricted", skip_serializing_if = "Option::is_none")]
    pub restricted: Option<String>,

    #[serde(rename = "@childCount", skip_serializing_if = "Option::is_none")]
    pub child_count: Option<String>,

    #[serde(rename = "dc:title", alias = "title")]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class")]
    pub class: String,
}

/// Item représentant un fichier média
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "@restricted", skip_serializing_if = "Option::is_none")]
    pub restricted: Option<String>,

    #[serde(rename = "dc:title", alias = "title")]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class")]
    pub class: String,

    #[serde(rename = "res", default)]
    pub resources: Vec<Resource>,
}

/// Ressource média (URL de streaming du fichier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "@protocolInfo")]
    pub protocol_info: String,

    #[serde(rename = "@size", skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(rename = "@duration", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(rename = "@resolution", skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    #[serde(rename = "$text")]
    pub url: String,
}

impl DIDLLite {
    /// Construit un document avec les namespaces usuels d'une réponse Browse
    pub fn new(containers: Vec<Container>, items: Vec<Item>) -> Self {
        Self {
            xmlns: DIDL_NAMESPACE.to_string(),
            xmlns_upnp: Some(UPNP_NAMESPACE.to_string()),
            xmlns_dc: Some(DC_NAMESPACE.to_string()),
            xmlns_dlna: Some(DLNA_NAMESPACE.to_string()),
            containers,
            items,
        }
    }

    /// Parse un document DIDL-Lite
    pub fn parse(input: &str) -> Result<Self, quick_xml::de::DeError> {
        quick_xml::de::from_str(input)
    }

    /// Sérialise le document en XML (sans déclaration `<?xml ...?>`)
    pub fn to_xml(&self) -> Result<String, String> {
        quick_xml::se::to_string(self).map_err(|e| format!("Failed to serialize DIDL-Lite: {}", e))
    }

    /// Trouve un container par ID
    pub fn get_container_by_id(&self, id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == id)
    }

    /// Trouve un item par ID
    pub fn get_item_by_id(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }
}

impl Item {
    /// Retourne la ressource principale (première disponible)
    pub fn primary_resource(&self) -> Option<&Resource> {
        self.resources.first()
    }
}

/// Construit le `protocolInfo` DLNA d'une ressource servie en HTTP GET
pub fn http_get_protocol_info(mime: &str) -> String {
    format!("http-get:*:{}:*", mime)
}
