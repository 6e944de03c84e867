//! Section schema extraction.
//!
//! A section declares its settings and blocks in a JSON body wrapped in
//! `{% schema %}` ... `{% endschema %}`. The scanner below walks Liquid tags
//! one at a time instead of pattern-matching the whole file, so tags inside
//! `{% comment %}` or `{% raw %}` regions are never mistaken for a schema and
//! an unterminated schema is reported instead of silently truncated.

use crate::error::{ProbeError, ProbeResult};
use crate::types::SectionSchema;
use tracing::debug;

const SCHEMA_TAG: &str = "schema";
const END_SCHEMA_TAG: &str = "endschema";

/// A `{% ... %}` tag located in markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tag<'a> {
    /// First word inside the delimiters, e.g. `schema` or `endcomment`.
    name: &'a str,
    /// Byte offset of `{%`.
    start: usize,
    /// Byte offset just past `%}`.
    end: usize,
}

/// Find the next tag at or after `from`.
fn next_tag(src: &str, from: usize) -> Option<Tag<'_>> {
    let open = from + src.get(from..)?.find("{%")?;
    let inner_start = open + 2;
    let close = inner_start + src[inner_start..].find("%}")?;

    let inner = src[inner_start..close]
        .trim_start_matches('-')
        .trim_end_matches('-')
        .trim();
    let name = inner.split_whitespace().next().unwrap_or("");

    Some(Tag {
        name,
        start: open,
        end: close + 2,
    })
}

/// Byte range of the first schema body, if any.
fn locate_schema_body(src: &str) -> ProbeResult<Option<(usize, usize)>> {
    let mut pos = 0;
    let mut skip_until: Option<&'static str> = None;
    let mut body_start: Option<usize> = None;

    while let Some(tag) = next_tag(src, pos) {
        pos = tag.end;

        if let Some(start) = body_start {
            if tag.name == END_SCHEMA_TAG {
                return Ok(Some((start, tag.start)));
            }
            continue;
        }

        if let Some(closing) = skip_until {
            if tag.name == closing {
                skip_until = None;
            }
            continue;
        }

        match tag.name {
            SCHEMA_TAG => body_start = Some(tag.end),
            "comment" => skip_until = Some("endcomment"),
            "raw" => skip_until = Some("endraw"),
            _ => {}
        }
    }

    match body_start {
        Some(start) => Err(ProbeError::Parse(format!(
            "schema tag at byte {start} has no matching endschema"
        ))),
        None => Ok(None),
    }
}

/// Extract the section schema embedded in raw Liquid markup.
///
/// Returns `Ok(None)` when the markup has no schema tag. Only the first
/// schema block counts; later ones are ignored.
pub fn extract_schema(raw_markup: &str) -> ProbeResult<Option<SectionSchema>> {
    let Some((start, end)) = locate_schema_body(raw_markup)? else {
        return Ok(None);
    };

    if let Ok(Some(_)) = locate_schema_body(&raw_markup[end..]) {
        debug!("section declares more than one schema block, using the first");
    }

    let body = raw_markup[start..end].trim();
    let schema: SectionSchema = serde_json::from_str(body)
        .map_err(|e| ProbeError::Parse(format!("invalid schema body: {e}")))?;
    Ok(Some(schema))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_types(schema: &SectionSchema) -> Vec<&str> {
        schema.blocks.iter().map(|b| b.block_type.as_str()).collect()
    }

    #[test]
    fn test_extracts_declared_block() {
        let markup = r#"{% schema %}{"blocks":[{"type":"X"}]}{% endschema %}"#;
        let schema = extract_schema(markup).unwrap().unwrap();
        assert_eq!(block_types(&schema), vec!["X"]);
    }

    #[test]
    fn test_realistic_section() {
        let markup = r#"
<section class="product">
  {%- for block in section.blocks -%}
    {%- case block.type -%}
      {%- when '@app' -%}
        {% render block %}
    {%- endcase -%}
  {%- endfor -%}
</section>

{% schema %}
{
  "name": "Product information",
  "blocks": [
    { "type": "@app" },
    { "type": "text", "name": "Text" }
  ],
  "settings": []
}
{% endschema %}
"#;
        let schema = extract_schema(markup).unwrap().unwrap();
        assert_eq!(schema.name.as_deref(), Some("Product information"));
        assert_eq!(block_types(&schema), vec!["@app", "text"]);
        assert_eq!(schema.blocks[1].name.as_deref(), Some("Text"));
    }

    #[test]
    fn test_no_schema_is_none() {
        assert_eq!(extract_schema("<div>{{ section.id }}</div>").unwrap(), None);
        assert_eq!(extract_schema("").unwrap(), None);
    }

    #[test]
    fn test_whitespace_control_dashes() {
        let markup = r#"{%- schema -%}{"blocks":[{"type":"@app"}]}{%- endschema -%}"#;
        let schema = extract_schema(markup).unwrap().unwrap();
        assert!(schema.declares("@app"));
    }

    #[test]
    fn test_tag_name_is_case_sensitive() {
        let markup = r#"{% SCHEMA %}{"blocks":[{"type":"@app"}]}{% ENDSCHEMA %}"#;
        assert_eq!(extract_schema(markup).unwrap(), None);
    }

    #[test]
    fn test_schema_inside_comment_is_ignored() {
        let markup = r#"
{% comment %}
  {% schema %}{"blocks":[{"type":"old"}]}{% endschema %}
{% endcomment %}
{% schema %}{"blocks":[{"type":"new"}]}{% endschema %}
"#;
        let schema = extract_schema(markup).unwrap().unwrap();
        assert_eq!(block_types(&schema), vec!["new"]);
    }

    #[test]
    fn test_schema_inside_raw_is_ignored() {
        let markup = r#"{% raw %}{% schema %}{"blocks":[]}{% endschema %}{% endraw %}"#;
        assert_eq!(extract_schema(markup).unwrap(), None);
    }

    #[test]
    fn test_first_of_multiple_schemas_wins() {
        let markup = r#"{% schema %}{"blocks":[{"type":"first"}]}{% endschema %}
{% schema %}{"blocks":[{"type":"second"}]}{% endschema %}"#;
        let schema = extract_schema(markup).unwrap().unwrap();
        assert_eq!(block_types(&schema), vec!["first"]);
    }

    #[test]
    fn test_unterminated_schema_is_parse_error() {
        let markup = r#"{% schema %}{"blocks":[{"type":"@app"}]}"#;
        assert!(matches!(extract_schema(markup), Err(ProbeError::Parse(_))));
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        let markup = "{% schema %}{ not json {% endschema %}";
        assert!(matches!(extract_schema(markup), Err(ProbeError::Parse(_))));
    }

    #[test]
    fn test_missing_blocks_is_empty() {
        let markup = r#"{% schema %}{"name":"Footer","settings":[]}{% endschema %}"#;
        let schema = extract_schema(markup).unwrap().unwrap();
        assert!(!schema.has_blocks());
    }

    #[test]
    fn test_next_tag_offsets() {
        let src = "ab{%- if x -%}cd";
        let tag = next_tag(src, 0).unwrap();
        assert_eq!(tag.name, "if");
        assert_eq!(tag.start, 2);
        assert_eq!(&src[tag.end..], "cd");
        assert_eq!(next_tag(src, tag.end), None);
    }
}
