//! Capability flags derived from section schemas.

use crate::types::SectionSchema;
use std::collections::{BTreeMap, BTreeSet};

/// Theme-wide support flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// At least one qualifying JSON template exists.
    pub supports_sections_everywhere: bool,
    /// Sections everywhere, and some main section declares at least one block.
    pub supports_app_blocks: bool,
}

/// For each target block type, whether any schema declares it.
///
/// Matching is exact. A `None` entry stands for a section without a usable
/// schema and declares nothing.
pub fn evaluate(
    schemas: &[Option<SectionSchema>],
    targets: &BTreeSet<String>,
) -> BTreeMap<String, bool> {
    targets
        .iter()
        .map(|target| {
            let found = schemas.iter().flatten().any(|s| s.declares(target));
            (target.clone(), found)
        })
        .collect()
}

/// Compute the theme-wide flags.
///
/// `qualifying_templates` counts template assets that matched the template
/// filter, whether or not they could be read.
pub fn assess(qualifying_templates: usize, schemas: &[Option<SectionSchema>]) -> Capabilities {
    let supports_sections_everywhere = qualifying_templates > 0;
    let any_blocks = schemas.iter().flatten().any(SectionSchema::has_blocks);

    Capabilities {
        supports_sections_everywhere,
        supports_app_blocks: supports_sections_everywhere && any_blocks,
    }
}
