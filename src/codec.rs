//! Opaque token codecs shared by global ids and connection cursors

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::is_graphql_name;
use crate::RelayError;

/// Namespace prefix of offset cursors, kept apart from global ids
const OFFSET_CURSOR_PREFIX: &str = "arrayconnection:";

/// Cursor encoding/decoding
pub struct CursorCodec;

impl CursorCodec {
    /// Encode cursor to base64
    pub fn encode(value: &str) -> String {
        BASE64.encode(value.as_bytes())
    }

    /// Decode cursor from base64
    pub fn decode(cursor: &str) -> crate::Result<String> {
        let bytes = BASE64
            .decode(cursor.as_bytes())
            .map_err(|e| RelayError::InvalidCursor(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| RelayError::InvalidCursor(e.to_string()))
    }

    /// Encode structured cursor (e.g., timestamp + ID)
    pub fn encode_structured<T: Serialize>(value: &T) -> crate::Result<String> {
        let json =
            serde_json::to_string(value).map_err(|e| RelayError::InvalidCursor(e.to_string()))?;
        Ok(BASE64.encode(json.as_bytes()))
    }

    /// Decode structured cursor
    pub fn decode_structured<T: for<'de> Deserialize<'de>>(cursor: &str) -> crate::Result<T> {
        let json = Self::decode(cursor)?;
        serde_json::from_str(&json).map_err(|e| RelayError::InvalidCursor(e.to_string()))
    }
}

/// Cursor of the item at `offset` in an offset-addressed connection
pub fn offset_to_cursor(offset: usize) -> String {
    CursorCodec::encode(&format!("{OFFSET_CURSOR_PREFIX}{offset}"))
}

/// Offset carried by an offset cursor, `None` when the cursor is not one
pub fn cursor_to_offset(cursor: &str) -> Option<usize> {
    let raw = CursorCodec::decode(cursor).ok()?;
    raw.strip_prefix(OFFSET_CURSOR_PREFIX)?.parse().ok()
}

/// Offset of an optional cursor, falling back to `default` when it is
/// absent or unreadable
pub fn offset_with_default(cursor: Option<&str>, default: usize) -> usize {
    cursor.and_then(cursor_to_offset).unwrap_or(default)
}

/// Globally unique identifier of an object: its kind plus its id within that kind
///
/// The wire form is `base64("<kind>:<id>")`. Kinds must be GraphQL names, which
/// never contain `:`, so splitting at the first `:` recovers the pair exactly.
/// Construction rejects any other kind, so every value encodes unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalId {
    kind: String,
    id: String,
}

impl GlobalId {
    /// Build an id, rejecting kinds that are not GraphQL names
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> crate::Result<Self> {
        let kind = kind.into();
        if !is_graphql_name(&kind) {
            return Err(RelayError::InvalidKind(kind));
        }
        Ok(Self { kind, id: id.into() })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Opaque token for this id
    pub fn encode(&self) -> String {
        CursorCodec::encode(&format!("{}:{}", self.kind, self.id))
    }

    /// Parse an opaque token back into its kind and local id
    pub fn decode(token: &str) -> crate::Result<Self> {
        let invalid = || RelayError::InvalidGlobalId(token.to_string());
        let raw = CursorCodec::decode(token).map_err(|_| invalid())?;
        let (kind, id) = raw.split_once(':').ok_or_else(invalid)?;
        Self::new(kind, id).map_err(|_| invalid())
    }

    /// Local id parsed as a UUID
    pub fn uuid(&self) -> crate::Result<Uuid> {
        Uuid::parse_str(&self.id).map_err(|_| RelayError::InvalidGlobalId(self.encode()))
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for GlobalId {
    type Err = RelayError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::decode(s)
    }
}

/// Encode a kind and local id into an opaque global id
pub fn to_global_id(kind: &str, id: &str) -> crate::Result<String> {
    Ok(GlobalId::new(kind, id)?.encode())
}

/// Decode an opaque global id into its kind and local id
pub fn from_global_id(token: &str) -> crate::Result<GlobalId> {
    GlobalId::decode(token)
}
