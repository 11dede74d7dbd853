use serde::{Serialize, Serializer};
use std::fmt;

/// Address token the runtime writes for objects without a stable pointer.
pub const NIL_ADDRESS: &str = "(nil)";

/// Type tag of immutable image data the collector never tracks.
pub const ROMDATA: &str = "romdata";

/// Address of a dumped object.
///
/// `Nil` covers both the literal `"(nil)"` token and a record with no `ptr`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Address {
    Known(String),
    Nil,
}

impl Address {
    pub fn from_token(token: Option<String>) -> Self {
        match token {
            Some(t) if !t.is_empty() && t != NIL_ADDRESS => Address::Known(t),
            _ => Address::Nil,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Address::Known(a) => a,
            Address::Nil => NIL_ADDRESS,
        }
    }

    pub fn known(&self) -> Option<&str> {
        match self {
            Address::Known(a) => Some(a),
            Address::Nil => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One reference occurrence inside a record's reference block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RefSlot {
    /// Anonymous record written inline by the dumper.
    Inline(Box<HeapRecord>),
    /// Bare address token.
    Address(String),
}

/// Dict-like `{key, value}` pair. Either side may be absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub key: Option<RefSlot>,
    pub value: Option<RefSlot>,
}

/// Reference block shape, decided once when the record is parsed.
///
/// Dumpers only ever fill one shape per object kind; when several fields are
/// present the first of children, items, globals, locals, function wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum References {
    Entries(Vec<Entry>),
    Items(Vec<Option<RefSlot>>),
    Globals(RefSlot),
    Locals(RefSlot),
    Function(RefSlot),
    Empty,
}

impl References {
    /// Relation kind that gates this shape, `None` for `Empty`.
    pub fn relation(&self) -> Option<RelationKind> {
        match self {
            References::Entries(_) => Some(RelationKind::Children),
            References::Items(_) => Some(RelationKind::Items),
            References::Globals(_) => Some(RelationKind::Globals),
            References::Locals(_) => Some(RelationKind::Locals),
            References::Function(_) => Some(RelationKind::Function),
            References::Empty => None,
        }
    }
}

/// Kinds of edge the graph builder can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKind {
    Children,
    Items,
    Globals,
    Locals,
    Function,
    Owner,
}

impl RelationKind {
    pub const ALL: [RelationKind; 6] = [
        RelationKind::Children,
        RelationKind::Items,
        RelationKind::Globals,
        RelationKind::Locals,
        RelationKind::Function,
        RelationKind::Owner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Children => "children",
            RelationKind::Items => "items",
            RelationKind::Globals => "globals",
            RelationKind::Locals => "locals",
            RelationKind::Function => "function",
            RelationKind::Owner => "owner",
        }
    }
}

/// A single heap object as dumped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeapRecord {
    #[serde(rename = "ptr")]
    pub address: Address,
    #[serde(rename = "type")]
    pub kind: String,
    pub alloc: u64,
    #[serde(rename = "shortval", skip_serializing_if = "Option::is_none")]
    pub short_value: Option<String>,
    #[serde(rename = "owner", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub references: References,
}

impl HeapRecord {
    pub fn is_romdata(&self) -> bool {
        self.kind == ROMDATA
    }
}
