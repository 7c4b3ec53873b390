//! YAML front matter codec for post documents.
//!
//! A document is a `---` line, a YAML mapping, a closing `---` line, then the
//! body. Only the mapping is ever re-serialized; the body is carried through
//! byte-for-byte. Keys keep their original position, so unknown fields
//! round-trip unchanged.

use std::collections::BTreeSet;

use serde_yaml::{Mapping, Value};

use scriptorium_shared::{Result, ScriptoriumError};

/// Front matter key holding the computed related slugs.
pub const RELATED_POSTS_KEY: &str = "relatedPosts";

const DELIMITER: &str = "---";

/// A parsed post document: front matter plus untouched body.
#[derive(Debug, Clone)]
pub struct Document {
    pub front_matter: FrontMatter,
    body: String,
}

impl Document {
    /// Split and parse a document.
    pub fn parse(text: &str) -> Result<Self> {
        let (yaml, body) = split(text)?;
        let front_matter = FrontMatter::parse(yaml)?;
        Ok(Self {
            front_matter,
            body: body.to_string(),
        })
    }

    /// The body exactly as it appeared after the closing delimiter.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Serialize the document back to text.
    pub fn render(&self) -> Result<String> {
        let yaml = self.front_matter.to_yaml()?;
        Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{}", self.body))
    }
}

/// Split a document into its YAML block and its body.
fn split(text: &str) -> Result<(&str, &str)> {
    let mut lines = text.split_inclusive('\n');

    let opening = lines
        .next()
        .ok_or_else(|| ScriptoriumError::parse("empty document"))?;
    if !is_delimiter(opening) {
        return Err(ScriptoriumError::parse("document does not start with ---"));
    }

    let yaml_start = opening.len();
    let mut offset = yaml_start;
    for line in lines {
        if is_delimiter(line) {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return Ok((yaml, body));
        }
        offset += line.len();
    }

    Err(ScriptoriumError::parse("front matter block is not terminated"))
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']).trim_end() == DELIMITER
}

// ---------------------------------------------------------------------------
// FrontMatter
// ---------------------------------------------------------------------------

/// Typed view over a front matter mapping.
///
/// `slug` and `tags` are validated on parse. Everything else stays in the
/// ordered mapping untouched.
#[derive(Debug, Clone)]
pub struct FrontMatter {
    fields: Mapping,
    slug: String,
    tags: BTreeSet<String>,
}

impl FrontMatter {
    /// Parse a YAML mapping. An empty block is an empty mapping.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Self::from_mapping(Mapping::new());
        }

        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| ScriptoriumError::parse(format!("invalid YAML front matter: {e}")))?;

        let fields = match value {
            Value::Null => Mapping::new(),
            Value::Mapping(map) => map,
            other => {
                return Err(ScriptoriumError::parse(format!(
                    "front matter must be a mapping, found {}",
                    kind(&other)
                )));
            }
        };

        Self::from_mapping(fields)
    }

    /// Build the typed view from an already-parsed mapping.
    pub fn from_mapping(fields: Mapping) -> Result<Self> {
        let slug = match fields.get("slug") {
            None | Some(Value::Null) => String::new(),
            Some(value) => scalar_text(value).ok_or_else(|| {
                ScriptoriumError::parse(format!("slug must be a scalar, found {}", kind(value)))
            })?,
        };

        let tags = match fields.get("tags") {
            None | Some(Value::Null) => BTreeSet::new(),
            Some(Value::Sequence(items)) => items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| {
                    scalar_text(item).ok_or_else(|| {
                        ScriptoriumError::parse(format!(
                            "tags must be scalars, found {}",
                            kind(item)
                        ))
                    })
                })
                .collect::<Result<BTreeSet<_>>>()?,
            Some(other) => {
                return Err(ScriptoriumError::parse(format!(
                    "tags must be a sequence, found {}",
                    kind(other)
                )));
            }
        };

        Ok(Self { fields, slug, tags })
    }

    /// Post slug. Missing slugs read as the empty string.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// De-duplicated tag set. Missing tags read as empty.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    /// Current `relatedPosts` value, ignoring non-string items.
    pub fn related_posts(&self) -> Vec<String> {
        self.fields
            .get(RELATED_POSTS_KEY)
            .and_then(Value::as_sequence)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace `relatedPosts`, keeping its position if it already exists.
    ///
    /// An empty list is still written.
    pub fn set_related_posts(&mut self, slugs: &[String]) {
        let seq = slugs.iter().cloned().map(Value::String).collect();
        self.fields
            .insert(Value::String(RELATED_POSTS_KEY.into()), Value::Sequence(seq));
    }

    /// Raw field access for passthrough keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.fields)
            .map_err(|e| ScriptoriumError::parse(format!("cannot serialize front matter: {e}")))
    }
}

/// Text form of a YAML scalar; `None` for nulls and collections.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
