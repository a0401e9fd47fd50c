//! Key encodings for the type index and the edge trees.

use std::fmt;

/// Separator between key components. Record ids may not contain it.
pub const SEPARATOR: u8 = 0;

/// Size of the creation timestamp in a type index key.
pub const CREATED_AT_SIZE: usize = 8;

/// A type index entry.
///
/// Key format: `[kind label][0][created_at (8 bytes, big-endian)][id]`
///
/// Big-endian encoding makes lexicographic key order equal to the total order
/// (kind, creation time, id), so a forward scan of the index tree is already
/// sorted for pagination.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeIndexKey {
    /// Kind label (e.g. `XtdSubject`).
    pub kind: String,
    /// Creation timestamp in microseconds since Unix epoch.
    pub created_at: u64,
    /// Record id.
    pub id: String,
}

impl TypeIndexKey {
    /// Create a new type index key.
    pub fn new(kind: impl Into<String>, created_at: u64, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            created_at,
            id: id.into(),
        }
    }

    /// Encode the key to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.kind.len() + 1 + CREATED_AT_SIZE + self.id.len());
        buf.extend_from_slice(self.kind.as_bytes());
        buf.push(SEPARATOR);
        buf.extend_from_slice(&self.created_at.to_be_bytes());
        buf.extend_from_slice(self.id.as_bytes());
        buf
    }

    /// Decode a key from bytes.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let sep = bytes.iter().position(|b| *b == SEPARATOR)?;
        let rest = &bytes[sep + 1..];
        if rest.len() < CREATED_AT_SIZE {
            return None;
        }

        let kind = std::str::from_utf8(&bytes[..sep]).ok()?.to_string();
        let mut ts_bytes = [0u8; CREATED_AT_SIZE];
        ts_bytes.copy_from_slice(&rest[..CREATED_AT_SIZE]);
        let id = std::str::from_utf8(&rest[CREATED_AT_SIZE..]).ok()?.to_string();

        Some(Self {
            kind,
            created_at: u64::from_be_bytes(ts_bytes),
            id,
        })
    }

    /// Prefix for scanning all records of one kind.
    pub fn kind_prefix(kind: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(kind.len() + 1);
        prefix.extend_from_slice(kind.as_bytes());
        prefix.push(SEPARATOR);
        prefix
    }
}

impl fmt::Debug for TypeIndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeIndexKey")
            .field("kind", &self.kind)
            .field("created_at", &self.created_at)
            .field("id", &self.id)
            .finish()
    }
}

/// A directed edge between two records.
///
/// Key format: `[from][0][relation label][0][to]`. The inverse tree stores the
/// same triple with `from` and `to` swapped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub from: String,
    pub relation: String,
    pub to: String,
}

impl EdgeKey {
    /// Create a new edge key.
    pub fn new(from: impl Into<String>, relation: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            relation: relation.into(),
            to: to.into(),
        }
    }

    /// Encode as an outgoing key.
    pub fn encode(&self) -> Vec<u8> {
        Self::join(&self.from, &self.relation, &self.to)
    }

    /// Encode as an incoming (inverse) key.
    pub fn encode_inverse(&self) -> Vec<u8> {
        Self::join(&self.to, &self.relation, &self.from)
    }

    /// Decode an outgoing key.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let (a, relation, b) = Self::split(bytes)?;
        Some(Self::new(a, relation, b))
    }

    /// Decode an incoming key back into the edge it mirrors.
    pub fn decode_inverse(bytes: &[u8]) -> Option<Self> {
        let (a, relation, b) = Self::split(bytes)?;
        Some(Self::new(b, relation, a))
    }

    /// Prefix for scanning all edges of one relation leaving (or, in the
    /// inverse tree, entering) a record.
    pub fn prefix(id: &str, relation: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(id.len() + relation.len() + 2);
        prefix.extend_from_slice(id.as_bytes());
        prefix.push(SEPARATOR);
        prefix.extend_from_slice(relation.as_bytes());
        prefix.push(SEPARATOR);
        prefix
    }

    /// Prefix for scanning every edge touching a record in one tree.
    pub fn record_prefix(id: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(id.len() + 1);
        prefix.extend_from_slice(id.as_bytes());
        prefix.push(SEPARATOR);
        prefix
    }

    fn join(a: &str, relation: &str, b: &str) -> Vec<u8> {
        let mut key = Self::prefix(a, relation);
        key.extend_from_slice(b.as_bytes());
        key
    }

    fn split(bytes: &[u8]) -> Option<(&str, &str, &str)> {
        let mut parts = bytes.splitn(3, |b| *b == SEPARATOR);
        let a = std::str::from_utf8(parts.next()?).ok()?;
        let relation = std::str::from_utf8(parts.next()?).ok()?;
        let b = std::str::from_utf8(parts.next()?).ok()?;
        Some((a, relation, b))
    }
}

/// The manifest of one relationship slot.
///
/// Key format: `[from][0][relation label][0]`, value: target ids joined by the
/// separator. Edge writes read the current target set from here inside their
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub from: String,
    pub relation: String,
}

impl SlotKey {
    /// Create a new slot key.
    pub fn new(from: impl Into<String>, relation: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            relation: relation.into(),
        }
    }

    /// Encode the key to bytes.
    pub fn encode(&self) -> Vec<u8> {
        EdgeKey::prefix(&self.from, &self.relation)
    }

    /// Edge key from this slot to `to`.
    pub fn edge(&self, to: impl Into<String>) -> EdgeKey {
        EdgeKey::new(self.from.as_str(), self.relation.as_str(), to)
    }

    /// Encode a target list as a manifest value.
    pub fn encode_targets<S: AsRef<str>>(targets: &[S]) -> Vec<u8> {
        let mut buf = Vec::new();
        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                buf.push(SEPARATOR);
            }
            buf.extend_from_slice(target.as_ref().as_bytes());
        }
        buf
    }

    /// Decode a manifest value. An empty value is an empty slot.
    pub fn decode_targets(bytes: &[u8]) -> Option<Vec<String>> {
        if bytes.is_empty() {
            return Some(Vec::new());
        }
        bytes
            .split(|b| *b == SEPARATOR)
            .map(|part| std::str::from_utf8(part).ok().map(str::to_string))
            .collect()
    }
}

/// Get current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
