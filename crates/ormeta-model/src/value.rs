//! Semantic value types
//!
//! Provides [`ValueType`], the declared shape of a persistent member. Strategy
//! inference and structural validation are keyed on it.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Temporal value flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemporalKind {
    Date,
    Time,
    Timestamp,
    Calendar,
    Instant,
}

impl TemporalKind {
    /// Parse a kebab-case name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "date" => Some(Self::Date),
            "time" => Some(Self::Time),
            "timestamp" => Some(Self::Timestamp),
            "calendar" => Some(Self::Calendar),
            "instant" => Some(Self::Instant),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Calendar => "calendar",
            Self::Instant => "instant",
        }
    }
}

/// Declared value type of a member
///
/// Container shapes carry their element (and key) types so the parsers can
/// build element/key sub-descriptors with the same shape. Serialized in a
/// compact text form: `long`, `timestamp`, `enum<shop.Status>`,
/// `collection<shop.LineItem>`, `map<text, long>`, `int[]`, or a bare type
/// name for object references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Text,
    Temporal(TemporalKind),
    Decimal,
    BigInteger,
    /// Raw byte array
    Bytes,
    /// Raw char array
    Chars,
    /// Enumeration declared as the named type
    Enum(String),
    Array(Box<ValueType>),
    Collection(Box<ValueType>),
    Map {
        key: Box<ValueType>,
        value: Box<ValueType>,
    },
    /// Reference to a declared (possibly persistent) type
    Object(String),
}

impl ValueType {
    /// Reference to a declared type
    #[inline]
    #[must_use]
    pub fn object(name: impl Into<String>) -> Self {
        Self::Object(name.into())
    }

    /// Collection of elements
    #[inline]
    #[must_use]
    pub fn collection(element: Self) -> Self {
        Self::Collection(Box::new(element))
    }

    /// Map from key to value
    #[inline]
    #[must_use]
    pub fn map(key: Self, value: Self) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Array of elements
    #[inline]
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::Array(Box::new(element))
    }

    /// Primitive, boxed primitive or character
    #[must_use]
    pub fn is_primitive_like(&self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Byte
                | Self::Char
                | Self::Short
                | Self::Int
                | Self::Long
                | Self::Float
                | Self::Double
        )
    }

    /// Whole-number or floating point, including arbitrary precision
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Short
                | Self::Int
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::Decimal
                | Self::BigInteger
        )
    }

    /// Arbitrary-precision numeric
    #[inline]
    #[must_use]
    pub fn is_big_numeric(&self) -> bool {
        matches!(self, Self::Decimal | Self::BigInteger)
    }

    /// Textual value
    #[inline]
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }

    /// Date-like value
    #[inline]
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Temporal(_))
    }

    /// Raw byte or char array, in either spelling
    #[must_use]
    pub fn is_raw_array(&self) -> bool {
        match self {
            Self::Bytes | Self::Chars => true,
            Self::Array(element) => matches!(**element, Self::Byte | Self::Char),
            _ => false,
        }
    }

    /// Array, collection or map
    #[inline]
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Collection(_) | Self::Map { .. })
    }

    /// Map shape
    #[inline]
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map { .. })
    }

    /// Element type of a container (map value for maps)
    #[must_use]
    pub fn element(&self) -> Option<&Self> {
        match self {
            Self::Array(e) | Self::Collection(e) => Some(&**e),
            Self::Map { value, .. } => Some(&**value),
            _ => None,
        }
    }

    /// Key type of a map
    #[must_use]
    pub fn key(&self) -> Option<&Self> {
        match self {
            Self::Map { key, .. } => Some(&**key),
            _ => None,
        }
    }

    /// Name of the referenced declared type, if any
    #[must_use]
    pub fn referenced_type(&self) -> Option<&str> {
        match self {
            Self::Object(name) | Self::Enum(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Version fields must be numeric or timestamp-like
    #[must_use]
    pub fn is_version_compatible(&self) -> bool {
        matches!(
            self,
            Self::Short | Self::Int | Self::Long | Self::BigInteger
        ) || matches!(
            self,
            Self::Temporal(TemporalKind::Timestamp | TemporalKind::Instant)
        )
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::Byte => f.write_str("byte"),
            Self::Char => f.write_str("char"),
            Self::Short => f.write_str("short"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::Text => f.write_str("text"),
            Self::Temporal(kind) => f.write_str(kind.as_str()),
            Self::Decimal => f.write_str("decimal"),
            Self::BigInteger => f.write_str("big-integer"),
            Self::Bytes => f.write_str("bytes"),
            Self::Chars => f.write_str("chars"),
            Self::Enum(name) => write!(f, "enum<{name}>"),
            Self::Object(name) => f.write_str(name),
            Self::Array(e) => write!(f, "{e}[]"),
            Self::Collection(e) => write!(f, "collection<{e}>"),
            Self::Map { key, value } => write!(f, "map<{key}, {value}>"),
        }
    }
}

impl FromStr for ValueType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ModelError::InvalidValueType(s.to_string());
        if s.is_empty() {
            return Err(invalid());
        }
        if let Some(element) = s.strip_suffix("[]") {
            return Ok(Self::array(element.parse()?));
        }
        if let Some((head, rest)) = s.split_once('<') {
            let inner = rest.strip_suffix('>').ok_or_else(invalid)?;
            return match head.trim() {
                "collection" | "list" | "set" => Ok(Self::collection(inner.parse()?)),
                "enum" => Ok(Self::Enum(inner.trim().to_string())),
                "map" => {
                    let (key, value) = split_top_level(inner).ok_or_else(invalid)?;
                    Ok(Self::map(key.parse()?, value.parse()?))
                }
                _ => Err(invalid()),
            };
        }
        if s.contains(|c: char| matches!(c, '>' | ',' | ' ')) {
            return Err(invalid());
        }
        let ty = match s {
            "boolean" | "bool" => Self::Boolean,
            "byte" => Self::Byte,
            "char" => Self::Char,
            "short" => Self::Short,
            "int" | "integer" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "text" | "string" => Self::Text,
            "decimal" => Self::Decimal,
            "big-integer" => Self::BigInteger,
            "bytes" => Self::Bytes,
            "chars" => Self::Chars,
            other => match TemporalKind::from_name(other) {
                Some(kind) => Self::Temporal(kind),
                None => Self::Object(other.to_string()),
            },
        };
        Ok(ty)
    }
}

/// Split `a, b` at the first comma outside angle brackets
fn split_top_level(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (idx, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((&s[..idx], &s[idx + 1..])),
            _ => {}
        }
    }
    None
}

impl TryFrom<String> for ValueType {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ValueType> for String {
    fn from(value: ValueType) -> Self {
        value.to_string()
    }
}
