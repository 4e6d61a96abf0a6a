//! Key-value pairs attached to a record's JSON payload.

use std::{collections::BTreeMap, fmt};

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::keys;

type FieldValue<'a> = Box<dyn erased_serde::Serialize + 'a>;

/// A caller-supplied key-value pair for the structured payload of a record.
///
/// The value is kept as a type-erased [`serde::Serialize`] implementation and serialized only
/// when the record is emitted.
pub struct Field<'a> {
    key: String,
    value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    /// Creates a new field from a key and any serializable value.
    pub fn new<V>(key: impl Into<String>, value: V) -> Self
    where
        V: Serialize + 'a,
    {
        Self {
            key: key.into(),
            value: Box::new(value),
        }
    }

    /// The key of the field, as supplied by the caller.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Shorthand for [`Field::new`].
pub fn field<'a, V>(key: impl Into<String>, value: V) -> Field<'a>
where
    V: Serialize + 'a,
{
    Field::new(key, value)
}

/// The fields of a single record.
///
/// Keys are unique: inserting a key that is already present replaces the earlier value. A field
/// named `message` is stored as `_message_` so that it cannot collide with the record's own
/// message. Serializes as a JSON object with keys in sorted order.
#[derive(Default)]
pub struct Fields<'a> {
    values: BTreeMap<String, FieldValue<'a>>,
}

impl<'a> Fields<'a> {
    /// Creates an empty set of fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, replacing any earlier value stored under the same key.
    pub fn insert(&mut self, field: Field<'a>) {
        let Field { mut key, value } = field;
        if key == keys::MESSAGE {
            key = keys::SHADOWED_MESSAGE.to_owned();
        }
        self.values.insert(key, value);
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no fields were attached.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether a value is stored under `key`, after the `message` renaming.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl<'a> Extend<Field<'a>> for Fields<'a> {
    fn extend<I: IntoIterator<Item = Field<'a>>>(&mut self, iter: I) {
        for field in iter {
            self.insert(field);
        }
    }
}

impl<'a> FromIterator<Field<'a>> for Fields<'a> {
    fn from_iter<I: IntoIterator<Item = Field<'a>>>(iter: I) -> Self {
        let mut fields = Self::new();
        fields.extend(iter);
        fields
    }
}

impl Serialize for Fields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl fmt::Debug for Fields<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
