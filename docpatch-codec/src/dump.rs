//! Dump files — the editable document set handed to the external editor.
//!
//! | shape   | layout                                                   |
//! |---------|----------------------------------------------------------|
//! | `Array` | `[` documents separated by `,` `]`, indented or compact  |
//! | `Lines` | one compact document per line                            |
//!
//! The reader for `Lines` accepts any stream of consecutive JSON documents,
//! so a user who re-indents a line still produces a readable file.

use docpatch_core::{Document, DumpShape, Mode};

use crate::decode::{document_from_json, json_type};
use crate::encode::{to_extended_json, write_json, EncodeOptions};
use crate::error::{DecodeError, EncodeError};

/// How a dump is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFormat {
    pub mode: Mode,
    pub shape: DumpShape,
    /// For `Array`: one line per document instead of indented documents.
    pub compact: bool,
    pub indent: String,
}

impl DumpFormat {
    pub fn new(mode: Mode, shape: DumpShape) -> Self {
        Self {
            mode,
            shape,
            compact: false,
            indent: "  ".to_string(),
        }
    }
}

impl From<&docpatch_core::EngineConfig> for DumpFormat {
    fn from(config: &docpatch_core::EngineConfig) -> Self {
        Self {
            mode: config.dump_mode,
            shape: config.dump_shape,
            compact: config.compact_dump,
            indent: config.indent.clone(),
        }
    }
}

/// Render `docs` as dump text. Always ends with a newline.
pub fn write_dump(docs: &[Document], format: &DumpFormat) -> Result<String, EncodeError> {
    if format.mode == Mode::Shell {
        return Err(EncodeError::UnreadableDumpMode { mode: format.mode });
    }

    let trees = docs
        .iter()
        .map(|doc| to_extended_json(doc, format.mode))
        .collect::<Result<Vec<_>, _>>()?;

    let compact = EncodeOptions::new(format.mode, true);
    let mut out = String::new();
    match format.shape {
        DumpShape::Lines => {
            for tree in &trees {
                out.push_str(&write_json(tree, &compact)?);
                out.push('\n');
            }
        }
        DumpShape::Array if trees.is_empty() => out.push_str("[]\n"),
        DumpShape::Array if format.compact => {
            out.push_str("[\n");
            let lines = trees
                .iter()
                .map(|tree| write_json(tree, &compact))
                .collect::<Result<Vec<_>, _>>()?;
            out.push_str(&lines.join(",\n"));
            out.push_str("\n]\n");
        }
        DumpShape::Array => {
            let pretty = EncodeOptions::new(format.mode, false).with_indent(format.indent.clone());
            out.push_str(&write_json(&serde_json::Value::Array(trees), &pretty)?);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Parse dump text in `shape`, preserving document order.
///
/// Whitespace-only text yields no documents. Errors inside a document carry
/// its zero-based index.
pub fn read_dump(text: &str, shape: DumpShape) -> Result<Vec<Document>, DecodeError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match shape {
        DumpShape::Array => {
            let json: serde_json::Value = serde_json::from_str(text)?;
            let items = json.as_array().ok_or(DecodeError::NotAnArray {
                found: json_type(&json),
            })?;
            items
                .iter()
                .enumerate()
                .map(|(index, item)| document_from_json(item).map_err(|e| DecodeError::at(index, e)))
                .collect()
        }
        DumpShape::Lines => serde_json::Deserializer::from_str(text)
            .into_iter::<serde_json::Value>()
            .enumerate()
            .map(|(index, item)| {
                let item = item.map_err(|e| DecodeError::at(index, e.into()))?;
                document_from_json(&item).map_err(|e| DecodeError::at(index, e))
            })
            .collect(),
    }
}
