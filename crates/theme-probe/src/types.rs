//! Core value types flowing through a probe.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Role a theme plays in the shop.
///
/// Upstream data has been seen in both `main` and `MAIN` spellings, so
/// parsing is case-insensitive. Serialized upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThemeRole {
    Main,
    Unpublished,
    Demo,
    Development,
    Other(String),
}

impl ThemeRole {
    /// Whether this role marks the theme shoppers currently see.
    pub fn is_published(&self) -> bool {
        matches!(self, ThemeRole::Main)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ThemeRole::Main => "MAIN",
            ThemeRole::Unpublished => "UNPUBLISHED",
            ThemeRole::Demo => "DEMO",
            ThemeRole::Development => "DEVELOPMENT",
            ThemeRole::Other(s) => s,
        }
    }
}

impl From<&str> for ThemeRole {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "MAIN" => ThemeRole::Main,
            "UNPUBLISHED" => ThemeRole::Unpublished,
            "DEMO" => ThemeRole::Demo,
            "DEVELOPMENT" => ThemeRole::Development,
            other => ThemeRole::Other(other.to_string()),
        }
    }
}

impl From<String> for ThemeRole {
    fn from(s: String) -> Self {
        ThemeRole::from(s.as_str())
    }
}

impl From<ThemeRole> for String {
    fn from(role: ThemeRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for ThemeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A theme as listed by the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSummary {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub role: ThemeRole,
}

impl ThemeSummary {
    pub fn new(id: u64, name: impl Into<String>, role: impl Into<ThemeRole>) -> Self {
        Self {
            id,
            name: name.into(),
            role: role.into(),
        }
    }
}

/// A file inside a theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub key: String,
    /// Raw text, or `None` when the asset has only been listed.
    pub content: Option<String>,
}

impl Asset {
    pub fn listed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: None,
        }
    }

    pub fn fetched(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: Some(content.into()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

/// Asset key of the JSON template for a page type, e.g. `templates/product.json`.
pub fn template_key(name: &str) -> String {
    format!("templates/{name}.json")
}

/// Asset key of a section's markup, e.g. `sections/main-product.liquid`.
pub fn section_key(section_type: &str) -> String {
    format!("sections/{section_type}.liquid")
}

/// One configurable sub-element declared by a section schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The JSON schema a section embeds in its markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub blocks: Vec<SchemaBlock>,
}

impl SectionSchema {
    pub fn declares(&self, block_type: &str) -> bool {
        self.blocks.iter().any(|b| b.block_type == block_type)
    }

    pub fn has_blocks(&self) -> bool {
        !self.blocks.is_empty()
    }
}

/// A published catalog item usable as a preview target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedItem {
    pub id: String,
    pub title: String,
    pub handle: String,
}

/// Credentials and address of the shop being probed.
#[derive(Clone, PartialEq, Eq)]
pub struct ShopContext {
    /// Shop domain, e.g. `example.myshopify.com`.
    pub shop: String,
    pub access_token: String,
}

impl ShopContext {
    pub fn new(shop: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            shop: shop.into(),
            access_token: access_token.into(),
        }
    }
}

impl fmt::Debug for ShopContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopContext")
            .field("shop", &self.shop)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// What the probe found out about the published theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityReport {
    pub theme: Option<ThemeSummary>,
    pub supports_sections_everywhere: bool,
    pub supports_app_blocks: bool,
    /// `None` when upstream data was missing and the flags are undetermined.
    pub contains_block: Option<BTreeMap<String, bool>>,
    pub preview_url: Option<String>,
}

impl CapabilityReport {
    /// Report for a shop without a published theme.
    pub fn without_theme() -> Self {
        Self {
            theme: None,
            supports_sections_everywhere: false,
            supports_app_blocks: false,
            contains_block: None,
            preview_url: None,
        }
    }

    /// HTTP status for this report: 404 when there is nothing to preview
    /// against, 200 otherwise.
    pub fn http_status(&self, preview_required: bool) -> u16 {
        if self.theme.is_none() || (preview_required && self.preview_url.is_none()) {
            404
        } else {
            200
        }
    }
}
