use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::MappingError;
use crate::schema::Schema;
use crate::value::Value;

/// Result type of a mapping: `Ok(None)` means "absent, write nothing".
pub type MappedValue = Result<Option<Value>, MappingError>;

/// Extraction strategy for one field.
///
/// `value` is the ordinary extraction. A strategy that also knows how to
/// produce row `row` of a flattened record returns `true` from
/// `overrides_flatten` and implements `flatten_value`; otherwise the packer
/// falls back to `value` (repeating it, or indexing into it when it is a
/// sequence).
pub trait FieldMapping<R> {
    fn value(&self, record: &R, index: usize) -> MappedValue;

    fn overrides_flatten(&self) -> bool {
        false
    }

    fn flatten_value(&self, record: &R, index: usize, row: usize, rows: usize) -> MappedValue {
        let _ = (row, rows);
        self.value(record, index)
    }
}

/// Closure-backed mapping without a flatten override.
pub struct FnMapping<F>(pub F);

impl<R, F> FieldMapping<R> for FnMapping<F>
where
    F: Fn(&R, usize) -> MappedValue,
{
    fn value(&self, record: &R, index: usize) -> MappedValue {
        (self.0)(record, index)
    }
}

/// Closure-backed mapping with a flatten override.
pub struct FlattenMapping<F, G> {
    value: F,
    flatten: G,
}

impl<F, G> FlattenMapping<F, G> {
    pub fn new(value: F, flatten: G) -> Self {
        Self { value, flatten }
    }
}

impl<R, F, G> FieldMapping<R> for FlattenMapping<F, G>
where
    F: Fn(&R, usize) -> MappedValue,
    G: Fn(&R, usize, usize, usize) -> MappedValue,
{
    fn value(&self, record: &R, index: usize) -> MappedValue {
        (self.value)(record, index)
    }

    fn overrides_flatten(&self) -> bool {
        true
    }

    fn flatten_value(&self, record: &R, index: usize, row: usize, rows: usize) -> MappedValue {
        (self.flatten)(record, index, row, rows)
    }
}

enum Entry<R> {
    Active(Box<dyn FieldMapping<R>>),
    Disabled,
}

/// Field name → mapping strategy.
///
/// A field can be active, explicitly disabled (left out of the layout), or
/// absent (kept in the layout, cells stay zero).
pub struct MappingTable<R> {
    entries: HashMap<String, Entry<R>>,
}

impl<R> Default for MappingTable<R> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<R> fmt::Debug for MappingTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<(&str, bool)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.as_str(), matches!(e, Entry::Disabled)))
            .collect();
        names.sort_unstable();
        f.debug_struct("MappingTable").field("entries", &names).finish()
    }
}

impl<R> MappingTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &mut self,
        name: impl Into<String>,
        mapping: impl FieldMapping<R> + 'static,
    ) -> &mut Self {
        self.entries.insert(name.into(), Entry::Active(Box::new(mapping)));
        self
    }

    pub fn set_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&R, usize) -> MappedValue + 'static,
    {
        self.set(name, FnMapping(f))
    }

    pub fn set_flatten<F, G>(&mut self, name: impl Into<String>, value: F, flatten: G) -> &mut Self
    where
        F: Fn(&R, usize) -> MappedValue + 'static,
        G: Fn(&R, usize, usize, usize) -> MappedValue + 'static,
    {
        self.set(name, FlattenMapping::new(value, flatten))
    }

    /// Excludes `name` from the layout.
    pub fn disable(&mut self, name: impl Into<String>) -> &mut Self {
        self.entries.insert(name.into(), Entry::Disabled);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn FieldMapping<R>> {
        match self.entries.get(name) {
            Some(Entry::Active(m)) => Some(m.as_ref()),
            _ => None,
        }
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(Entry::Disabled))
    }

    /// Moves every entry of `overrides` into `self`, replacing same-named ones.
    pub fn extend(&mut self, overrides: MappingTable<R>) -> &mut Self {
        self.entries.extend(overrides.entries);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sparse, string-keyed record for callers without a static record type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    fields: BTreeMap<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Reads a same-named field from an [`Attributes`] record.
#[derive(Debug, Clone)]
pub struct Lookup {
    name: String,
}

impl Lookup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl FieldMapping<Attributes> for Lookup {
    fn value(&self, record: &Attributes, _index: usize) -> MappedValue {
        Ok(record.get(&self.name).cloned())
    }
}

impl MappingTable<Attributes> {
    /// A [`Lookup`] mapping for every field of `schema`.
    pub fn lookup_all(schema: &Schema) -> Self {
        let mut table = Self::new();
        for f in schema.fields() {
            table.set(f.name.clone(), Lookup::new(f.name.clone()));
        }
        table
    }
}
