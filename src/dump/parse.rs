//! Dump loading.
//!
//! JSON shape: a top-level array whose elements are object records:
//! {
//!   "ptr": "0x7f..." | "(nil)",   // optional, missing means "(nil)"
//!   "type": "dict",
//!   "alloc": 40,                  // optional, defaults to 0
//!   "shortval": "'abc'",          // optional
//!   "owner": "0x7f...",           // optional
//!   "children": [{"key": REF, "value": REF}],
//!   "items": [REF, ...],
//!   "globals" | "locals" | "function": REF
//! }
//! where REF is an inline record, a bare address string, or null.
//!
//! Non-object elements and objects that do not fit this shape are skipped and
//! recorded as anomalies. Only an unreadable file or invalid JSON is fatal.

use crate::Result;
use crate::diagnostics::{self, Anomalies, Anomaly};
use crate::dump::record::{Address, Entry, HeapRecord, RefSlot, References};

use anyhow::{Context, bail};
use serde::Deserialize;
use serde_json::Value;
use std::fs;

const PREVIEW_CHARS: usize = 60;

/// Parsed dump: every well-formed record in input order plus what was skipped.
#[derive(Debug, Clone, Default)]
pub struct Dump {
    pub records: Vec<HeapRecord>,
    pub anomalies: Anomalies,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRecord {
    #[serde(default)]
    ptr: Option<String>,

    #[serde(rename = "type", default)]
    kind: Option<String>,

    #[serde(default)]
    alloc: Option<u64>,

    #[serde(default)]
    shortval: Option<String>,

    #[serde(default)]
    owner: Option<String>,

    #[serde(default)]
    children: Option<Vec<RawEntry>>,

    #[serde(default)]
    items: Option<Vec<Option<RawRef>>>,

    #[serde(default)]
    globals: Option<RawRef>,

    #[serde(default)]
    locals: Option<RawRef>,

    #[serde(default)]
    function: Option<RawRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawRef {
    Inline(Box<RawRecord>),
    Address(String),
}

#[derive(Debug, Clone, Deserialize)]
struct RawEntry {
    #[serde(default)]
    key: Option<RawRef>,

    #[serde(default)]
    value: Option<RawRef>,
}

impl RawRef {
    fn into_slot(self) -> RefSlot {
        match self {
            RawRef::Inline(raw) => RefSlot::Inline(Box::new(raw.into_record())),
            RawRef::Address(addr) => RefSlot::Address(addr),
        }
    }
}

impl RawRecord {
    fn into_record(self) -> HeapRecord {
        // Empty arrays do not count as present.
        let references = if let Some(entries) = self.children.filter(|c| !c.is_empty()) {
            References::Entries(
                entries
                    .into_iter()
                    .map(|e| Entry {
                        key: e.key.map(RawRef::into_slot),
                        value: e.value.map(RawRef::into_slot),
                    })
                    .collect(),
            )
        } else if let Some(items) = self.items.filter(|i| !i.is_empty()) {
            References::Items(
                items
                    .into_iter()
                    .map(|i| i.map(RawRef::into_slot))
                    .collect(),
            )
        } else if let Some(g) = self.globals {
            References::Globals(g.into_slot())
        } else if let Some(l) = self.locals {
            References::Locals(l.into_slot())
        } else if let Some(f) = self.function {
            References::Function(f.into_slot())
        } else {
            References::Empty
        };

        HeapRecord {
            address: Address::from_token(self.ptr),
            kind: self.kind.unwrap_or_else(|| "unknown".to_string()),
            alloc: self.alloc.unwrap_or(0),
            short_value: self.shortval,
            owner: self.owner,
            references,
        }
    }
}

/// Read and parse a dump file.
pub fn load_dump(path: &str) -> Result<Dump> {
    let text = fs::read_to_string(path)
        .with_context(|| diagnostics::error_message(format!("read dump file {}", path)))?;
    parse_dump(&text).with_context(|| diagnostics::error_message(format!("load dump {}", path)))
}

/// Parse dump text. Fails only if the text is not a JSON array.
pub fn parse_dump(text: &str) -> Result<Dump> {
    let root: Value = serde_json::from_str(text).context("dump is not valid JSON")?;
    let elements = match root {
        Value::Array(elements) => elements,
        other => bail!("dump must be a JSON array, found {}", json_kind(&other)),
    };

    let mut dump = Dump::default();
    for (index, element) in elements.into_iter().enumerate() {
        if !element.is_object() {
            dump.anomalies.record(Anomaly::MalformedElement {
                index,
                preview: preview(&element),
            });
            continue;
        }
        match serde_json::from_value::<RawRecord>(element) {
            Ok(raw) => dump.records.push(raw.into_record()),
            Err(e) => dump.anomalies.record(Anomaly::MalformedRecord {
                index,
                reason: e.to_string(),
            }),
        }
    }

    log::info!(
        "parsed {} records ({} elements skipped)",
        dump.records.len(),
        dump.anomalies.len()
    );
    Ok(dump)
}

fn preview(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= PREVIEW_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::AnomalyKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn skips_non_object_elements() {
        let dump = parse_dump(r#"[1, "0x5", null, {"ptr": "0x1", "type": "list"}]"#).unwrap();
        assert_eq!(dump.records.len(), 1);
        assert_eq!(dump.anomalies.count(AnomalyKind::MalformedElement), 3);
        assert_eq!(dump.records[0].address, Address::Known("0x1".into()));
        assert_eq!(dump.records[0].references, References::Empty);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dump = parse_dump(r#"[{"type": "int"}, {"ptr": "(nil)"}]"#).unwrap();
        assert_eq!(dump.records[0].address, Address::Nil);
        assert_eq!(dump.records[0].alloc, 0);
        assert_eq!(dump.records[1].address, Address::Nil);
        assert_eq!(dump.records[1].kind, "unknown");
        assert!(dump.anomalies.is_empty());
    }

    #[test]
    fn ill_typed_object_is_a_malformed_record() {
        let dump = parse_dump(
            r#"[{"ptr": "0x1", "type": "int", "alloc": "big"},
                {"ptr": "0x2", "type": "list", "items": [3]},
                {"ptr": "0x3", "type": "int"}]"#,
        )
        .unwrap();
        assert_eq!(dump.records.len(), 1);
        assert_eq!(dump.anomalies.count(AnomalyKind::MalformedRecord), 2);
    }

    #[test]
    fn non_array_dump_is_fatal() {
        assert!(parse_dump(r#"{"ptr": "0x1"}"#).is_err());
        assert!(parse_dump("not json").is_err());
    }

    #[test]
    fn unreadable_file_is_fatal() {
        let err = load_dump("/nonexistent/heap-dump.json").unwrap_err();
        assert!(format!("{:#}", err).contains("read dump file"));
    }

    #[test]
    fn shape_priority_children_first() {
        let dump = parse_dump(
            r#"[{"ptr": "0x1", "type": "dict",
                 "children": [{"key": "0x2", "value": null}],
                 "items": ["0x3"], "globals": "0x4"}]"#,
        )
        .unwrap();
        assert_eq!(
            dump.records[0].references,
            References::Entries(vec![Entry {
                key: Some(RefSlot::Address("0x2".into())),
                value: None,
            }])
        );
    }

    #[test]
    fn empty_children_fall_through_to_items() {
        let dump = parse_dump(
            r#"[{"ptr": "0x1", "type": "list", "children": [], "items": ["0x3", null]}]"#,
        )
        .unwrap();
        assert_eq!(
            dump.records[0].references,
            References::Items(vec![Some(RefSlot::Address("0x3".into())), None])
        );
    }

    #[test]
    fn frame_slots_in_priority_order() {
        let dump = parse_dump(
            r#"[{"ptr": "0x1", "type": "fun", "locals": "0x2", "function": "0x3"},
                {"ptr": "0x4", "type": "fun", "function": {"ptr": "0x5", "type": "code"}}]"#,
        )
        .unwrap();
        assert_eq!(
            dump.records[0].references,
            References::Locals(RefSlot::Address("0x2".into()))
        );
        match &dump.records[1].references {
            References::Function(RefSlot::Inline(r)) => {
                assert_eq!(r.address, Address::Known("0x5".into()));
                assert_eq!(r.kind, "code");
            }
            other => panic!("unexpected references {:?}", other),
        }
    }

    #[test]
    fn long_elements_are_truncated_in_preview() {
        let long = "x".repeat(200);
        let dump = parse_dump(&format!(r#"["{}"]"#, long)).unwrap();
        match dump.anomalies.iter().next() {
            Some(Anomaly::MalformedElement { preview, .. }) => {
                assert!(preview.ends_with("..."));
                assert_eq!(preview.chars().count(), PREVIEW_CHARS + 3);
            }
            other => panic!("unexpected anomaly {:?}", other),
        }
    }
}
