//! Tri-state optional for wire payloads
//!
//! The remote service distinguishes a field that was omitted from a field
//! that was sent as an explicit `null`. `Option<T>` collapses the two, so
//! payload structs use [`Maybe<T>`] where the distinction matters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field that may be missing, explicitly null, or present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Maybe<T> {
    /// The field was not present in the payload
    #[default]
    Missing,
    /// The field was present as an explicit `null`
    Null,
    /// The field was present with a value
    Value(T),
}

impl<T> Maybe<T> {
    /// True if the field was absent from the payload
    #[inline]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// True if the field carried a value
    #[inline]
    pub const fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Get the value, if present
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Consume and return the value, if present
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Collapse into a plain `Option`, losing the missing/null distinction
    pub fn flatten(self) -> Option<T> {
        self.into_value()
    }
}

impl<T> From<Option<T>> for Maybe<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Self::Value(v),
            None => Self::Null,
        }
    }
}

// Deserializes via `Option`: an explicit `null` becomes `Null`, a value
// becomes `Value`. `Missing` only arises through `#[serde(default)]` on
// the containing field, which is how payload structs must annotate it.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Maybe<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

impl<T: Serialize> Serialize for Maybe<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            // Missing fields should be skipped with `skip_serializing_if`;
            // if one slips through it is indistinguishable from null.
            Self::Missing | Self::Null => serializer.serialize_none(),
            Self::Value(v) => serializer.serialize_some(v),
        }
    }
}
