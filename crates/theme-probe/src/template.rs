//! JSON template parsing.
//!
//! A JSON template maps section ids to section settings; the entry keyed
//! `main` names the section that renders the page.

use crate::error::ProbeResult;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Typed view of a JSON template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateDocument {
    /// Raw section entries; only `main` is narrowed to [`TemplateSection`].
    #[serde(default)]
    pub sections: BTreeMap<String, Value>,
}

/// One section entry inside a template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateSection {
    #[serde(rename = "type")]
    pub section_type: Option<String>,
}

impl TemplateDocument {
    /// Parse template text.
    ///
    /// Fails only on syntactically invalid JSON. A valid document whose
    /// shape does not match the template layout parses to `Ok(None)`.
    pub fn parse(text: &str) -> ProbeResult<Option<Self>> {
        let value: Value = serde_json::from_str(strip_leading_comment(text))?;
        match serde_json::from_value::<TemplateDocument>(value) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                debug!("template is valid JSON but not a template: {e}");
                Ok(None)
            }
        }
    }

    /// The `main` entry, if present and shaped like a section.
    pub fn main_section(&self) -> Option<TemplateSection> {
        let value = self.sections.get("main")?;
        match TemplateSection::deserialize(value) {
            Ok(section) => Some(section),
            Err(e) => {
                debug!("main section entry is malformed: {e}");
                None
            }
        }
    }

    pub fn main_section_type(&self) -> Option<String> {
        self.main_section()
            .and_then(|s| s.section_type)
            .filter(|t| !t.is_empty())
    }
}

/// Type of the template's `main` section, if it declares one.
pub fn main_section_type(json_text: &str) -> ProbeResult<Option<String>> {
    Ok(TemplateDocument::parse(json_text)?
        .as_ref()
        .and_then(TemplateDocument::main_section_type))
}

/// Drop one leading `/* ... */` comment.
///
/// The theme editor prepends an auto-generated notice to templates it saves.
fn strip_leading_comment(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.strip_prefix("/*") {
        Some(rest) => match rest.find("*/") {
            Some(end) => &rest[end + 2..],
            None => text,
        },
        None => text,
    }
}
