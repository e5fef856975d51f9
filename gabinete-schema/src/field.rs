//! Tri-state field used by partial-update payloads.
//!
//! JSON mapping:
//! - key absent => `Unchanged`
//! - `null` => `Clear`
//! - a value => `Set(value)`
//!
//! Fields of this type must carry `#[serde(default)]` so an absent key lands on `Unchanged`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    #[default]
    Unchanged,
    Clear,
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FieldUpdate::Unchanged)
    }

    /// `true` when the column must be written (either cleared or set).
    pub fn is_touched(&self) -> bool {
        !self.is_unchanged()
    }

    /// Value to write when touched; `None` means NULL.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            FieldUpdate::Set(v) => Some(v),
            FieldUpdate::Unchanged | FieldUpdate::Clear => None,
        }
    }
}

impl<T> From<T> for FieldUpdate<T> {
    fn from(value: T) -> Self {
        FieldUpdate::Set(value)
    }
}

impl<'de, T> Deserialize<'de> for FieldUpdate<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|v| v.map_or(FieldUpdate::Clear, FieldUpdate::Set))
    }
}

impl<T> Serialize for FieldUpdate<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldUpdate::Set(v) => serializer.serialize_some(v),
            FieldUpdate::Unchanged | FieldUpdate::Clear => serializer.serialize_none(),
        }
    }
}
