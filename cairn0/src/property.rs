//! Resource inputs that may embed Outputs anywhere.

use crate::error::OutputError;
use crate::output::{DependencySet, Output, OutputData, OutputValue};
use crate::wire::{PropertyBag, WireValue};
use futures::future::{self, BoxFuture, FutureExt};
use serde::Serialize;
use std::collections::BTreeMap;

/// One input property: a plain wire value, an Output, or a container of
/// either.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// A value known at declaration time.
    Value(WireValue),
    /// A deferred value.
    Output(Output<WireValue>),
    /// A list whose items may be deferred.
    List(Vec<PropertyValue>),
    /// A map whose values may be deferred.
    Map(BTreeMap<String, PropertyValue>),
}

/// A resolved property with the metadata of every Output inside it.
struct Resolved {
    value: WireValue,
    known: bool,
    secret: bool,
    dependencies: DependencySet,
}

impl PropertyValue {
    /// Embed a typed Output, converting its value to wire form.
    pub fn output<T: Serialize + OutputValue>(output: &Output<T>) -> Self {
        PropertyValue::Output(output.try_map(|value| Ok(WireValue::from_serialize(&value)?)))
    }

    /// Await every embedded Output. Unknown values become
    /// [`WireValue::Unknown`], secret ones are wrapped in
    /// [`WireValue::Secret`].
    fn resolve(&self) -> BoxFuture<'_, Result<Resolved, OutputError>> {
        async move {
            match self {
                PropertyValue::Value(value) => Ok(Resolved {
                    known: !value.contains_unknowns(),
                    secret: value.contains_secrets(),
                    value: value.clone(),
                    dependencies: DependencySet::new(),
                }),
                PropertyValue::Output(output) => {
                    let data: OutputData<WireValue> = output.resolve().await?;
                    let value = WireValue::from_output_data(&data);
                    Ok(Resolved {
                        known: data.is_known() && !value.contains_unknowns(),
                        secret: data.is_secret() || value.contains_secrets(),
                        dependencies: data.dependencies().clone(),
                        value,
                    })
                }
                PropertyValue::List(items) => {
                    let resolved =
                        future::try_join_all(items.iter().map(PropertyValue::resolve)).await?;
                    let mut merged = Resolved::empty();
                    let mut values = Vec::with_capacity(resolved.len());
                    for item in resolved {
                        values.push(merged.absorb(item));
                    }
                    merged.value = WireValue::Array(values);
                    Ok(merged)
                }
                PropertyValue::Map(entries) => {
                    let resolved = future::try_join_all(
                        entries
                            .iter()
                            .map(|(key, value)| value.resolve().map(move |r| r.map(|r| (key, r)))),
                    )
                    .await?;
                    let mut merged = Resolved::empty();
                    let mut values = BTreeMap::new();
                    for (key, item) in resolved {
                        values.insert(key.clone(), merged.absorb(item));
                    }
                    merged.value = WireValue::Object(values);
                    Ok(merged)
                }
            }
        }
        .boxed()
    }
}

impl Resolved {
    fn empty() -> Self {
        Self {
            value: WireValue::Null,
            known: true,
            secret: false,
            dependencies: DependencySet::new(),
        }
    }

    /// Fold `item`'s metadata into `self` and hand back its value.
    fn absorb(&mut self, item: Resolved) -> WireValue {
        self.known &= item.known;
        self.secret |= item.secret;
        self.dependencies.union_with(&item.dependencies);
        item.value
    }
}

impl From<WireValue> for PropertyValue {
    fn from(value: WireValue) -> Self {
        PropertyValue::Value(value)
    }
}

impl From<Output<WireValue>> for PropertyValue {
    fn from(output: Output<WireValue>) -> Self {
        PropertyValue::Output(output)
    }
}

impl From<&Output<WireValue>> for PropertyValue {
    fn from(output: &Output<WireValue>) -> Self {
        PropertyValue::Output(output.clone())
    }
}

impl From<Output<String>> for PropertyValue {
    fn from(output: Output<String>) -> Self {
        PropertyValue::Output(output.map(WireValue::String))
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Value(s.into())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Value(s.into())
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Value(b.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Value(n.into())
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Value(n.into())
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        PropertyValue::Value(value.into())
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(items: Vec<PropertyValue>) -> Self {
        PropertyValue::List(items)
    }
}

impl From<PropertyMap> for PropertyValue {
    fn from(map: PropertyMap) -> Self {
        PropertyValue::Map(map.entries)
    }
}

/// A resource's input properties after every embedded Output resolved.
#[derive(Debug, Clone)]
pub struct ResolvedProperties {
    /// Wire values, with unknown and secret markers in place.
    pub values: PropertyBag,
    /// Union of every embedded Output's dependencies.
    pub dependencies: DependencySet,
    /// Dependencies per top-level property.
    pub property_dependencies: BTreeMap<String, DependencySet>,
    /// Whether every embedded value is known.
    pub known: bool,
    /// Whether any embedded value is secret.
    pub secret: bool,
}

/// Input properties keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    entries: BTreeMap<String, PropertyValue>,
}

impl PropertyMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a property.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Borrow a property.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    /// Mutably borrow a property.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut PropertyValue> {
        self.entries.get_mut(key)
    }

    /// Remove a property.
    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.entries.remove(key)
    }

    /// Whether a property is set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.entries.iter()
    }

    /// The whole map as one Output: known only if every embedded value is,
    /// secret if any is, depending on everything any value depends on.
    pub fn into_output(self) -> Output<PropertyBag> {
        Output::from_data(async move {
            let resolved = self.resolve().await?;
            Ok(OutputData::new(
                Some(resolved.values),
                resolved.known,
                resolved.secret,
                resolved.dependencies,
            ))
        })
    }

    /// Await every embedded Output, concurrently.
    pub async fn resolve(&self) -> Result<ResolvedProperties, OutputError> {
        let resolved = future::try_join_all(
            self.entries
                .iter()
                .map(|(key, value)| value.resolve().map(move |r| r.map(|r| (key, r)))),
        )
        .await?;

        let mut out = ResolvedProperties {
            values: PropertyBag::new(),
            dependencies: DependencySet::new(),
            property_dependencies: BTreeMap::new(),
            known: true,
            secret: false,
        };
        for (key, item) in resolved {
            out.known &= item.known;
            out.secret |= item.secret;
            out.dependencies.union_with(&item.dependencies);
            out.property_dependencies
                .insert(key.clone(), item.dependencies);
            out.values.insert(key.clone(), item.value);
        }
        Ok(out)
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, PropertyValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
