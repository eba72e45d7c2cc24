//! Path-scoped writes against a JSON document.
//!
//! Every mutation the engine produces is a [`Patch`]: an ordered list of
//! set-at-path operations. Writers address the narrowest path they own so
//! that concurrent patches from different participants never overlap.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::types::ParticipantId;

/// Location inside a document, as a list of object keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocPath(Vec<String>);

impl DocPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Top-level document field
    pub fn field(name: &str) -> Self {
        Self::new([name])
    }

    /// `players/{id}`
    pub fn player(id: &ParticipantId) -> Self {
        Self::new(["players", id.as_str()])
    }

    /// `players/{id}/{field}`
    pub fn player_field(id: &ParticipantId, field: &str) -> Self {
        Self::player(id).child(field)
    }

    /// `players/{target}/votes/{voter}`
    pub fn vote(target: &ParticipantId, voter: &ParticipantId) -> Self {
        Self::player_field(target, "votes").child(voter)
    }

    pub fn child(&self, segment: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` is `other` or lies underneath it
    pub fn starts_with(&self, other: &DocPath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

/// Set `value` at `path`; `null` deletes the key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOp {
    pub path: DocPath,
    pub value: Value,
}

impl WriteOp {
    pub fn set(path: DocPath, value: impl Into<Value>) -> Self {
        Self {
            path,
            value: value.into(),
        }
    }

    pub fn delete(path: DocPath) -> Self {
        Self {
            path,
            value: Value::Null,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.value.is_null()
    }
}

/// Ordered set of writes committed as one logical update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    ops: Vec<WriteOp>,
    /// Must land whole or not at all
    #[serde(skip)]
    indivisible: bool,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(op: WriteOp) -> Self {
        Self {
            ops: vec![op],
            indivisible: false,
        }
    }

    /// Mark the patch as one unit. Its writes read from the same snapshot
    /// and a partial commit would leave them inconsistent.
    pub fn into_indivisible(mut self) -> Self {
        self.indivisible = true;
        self
    }

    pub fn is_indivisible(&self) -> bool {
        self.indivisible
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn set(&mut self, path: DocPath, value: impl Into<Value>) {
        self.push(WriteOp::set(path, value));
    }

    pub fn delete(&mut self, path: DocPath) {
        self.push(WriteOp::delete(path));
    }

    pub fn extend(&mut self, other: Patch) {
        self.indivisible |= other.indivisible;
        self.ops.extend(other.ops);
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// One single-op patch per write, in order. This is the narrowest
    /// scope the retry policy falls back to. An indivisible patch comes back
    /// whole.
    pub fn split(&self) -> Vec<Patch> {
        if self.indivisible {
            return vec![self.clone()];
        }
        self.ops.iter().cloned().map(Patch::single).collect()
    }

    /// Apply every op to `root` in order
    pub fn apply_to(&self, root: &mut Value) {
        for op in &self.ops {
            apply_op(root, op);
        }
    }
}

impl FromIterator<WriteOp> for Patch {
    fn from_iter<T: IntoIterator<Item = WriteOp>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
            indivisible: false,
        }
    }
}

/// Set-at-path merge: missing or non-object intermediates become objects,
/// a `null` value removes the key
pub fn apply_op(root: &mut Value, op: &WriteOp) {
    let Some((last, parents)) = op.path.segments().split_last() else {
        *root = op.value.clone();
        return;
    };

    let mut cursor = root;
    for segment in parents {
        if op.is_delete() && !cursor.get(segment).is_some_and(Value::is_object) {
            // Nothing to delete underneath a missing parent
            return;
        }
        cursor = ensure_object(cursor)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if op.is_delete() {
        if let Value::Object(map) = cursor {
            map.remove(last);
        }
    } else {
        ensure_object(cursor).insert(last.clone(), op.value.clone());
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}
