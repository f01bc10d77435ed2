//! The `Complex` property variant: an ordered set of sub-attribute children.

use std::collections::HashMap;
use std::sync::Arc;

use super::hash::combine_ordered;
use super::value::Value;
use super::Property;
use crate::error::ScimError;
use crate::schema::Attribute;

#[derive(Debug, Clone)]
pub struct ComplexProperty {
    attribute: Arc<Attribute>,
    children: Vec<Property>,
    name_index: HashMap<String, usize>,
}

impl ComplexProperty {
    pub fn new(attribute: Arc<Attribute>) -> Self {
        let mut name_index = HashMap::with_capacity(attribute.sub_attributes.len());
        let children = attribute
            .sub_attributes
            .iter()
            .enumerate()
            .map(|(i, sub)| {
                name_index.insert(sub.name.to_ascii_lowercase(), i);
                Property::new(Arc::clone(sub))
            })
            .collect();
        Self {
            attribute,
            children,
            name_index,
        }
    }

    pub fn attribute(&self) -> &Arc<Attribute> {
        &self.attribute
    }

    pub fn unassigned(&self) -> bool {
        self.children.iter().all(Property::unassigned)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, name: &str) -> Option<&Property> {
        self.name_index.get(&name.to_ascii_lowercase()).map(|&i| &self.children[i])
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Property> {
        let idx = *self.name_index.get(&name.to_ascii_lowercase())?;
        Some(&mut self.children[idx])
    }

    pub fn child_at(&self, index: usize) -> Option<&Property> {
        self.children.get(index)
    }

    pub fn children(&self) -> &[Property] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Property] {
        &mut self.children
    }

    pub fn iterate(&self, mut f: impl FnMut(&Property)) {
        for c in &self.children {
            f(c);
        }
    }

    pub fn find(&self, pred: impl Fn(&Property) -> bool) -> Option<&Property> {
        self.children.iter().find(|c| pred(c))
    }

    pub fn delete(&mut self) {
        for c in &mut self.children {
            c.delete();
        }
    }

    /// `set` on a complex property replaces its contents wholesale: clear,
    /// then merge (spec §4.B doesn't define this directly but `set(nil)`
    /// acting as delete generalizes naturally to clear-then-add).
    pub fn set(&mut self, v: Value) -> Result<(), ScimError> {
        if v.is_null() {
            self.delete();
            return Ok(());
        }
        self.delete();
        self.add(v)
    }

    /// Merge: each known sub-attribute in the map is set on the
    /// corresponding child; unknown keys are silently ignored.
    pub fn add(&mut self, v: Value) -> Result<(), ScimError> {
        let pairs = match v {
            Value::Complex(pairs) => pairs,
            Value::Null => return Ok(()),
            other => {
                return Err(ScimError::invalid_value(format!(
                    "attribute '{}' expects a complex value, got {:?}",
                    self.attribute.name, other
                )))
            }
        };
        for (name, value) in pairs {
            if let Some(child) = self.child_mut(&name) {
                child.add(value)?;
            }
        }
        Ok(())
    }

    pub fn value(&self) -> Value {
        Value::Complex(
            self.children
                .iter()
                .map(|c| (c.attribute().name.clone(), c.value()))
                .collect(),
        )
    }

    /// Per spec §3 invariant 5: the identity hash of a complex property is
    /// computed over the hashes of `identity`-marked sub-attributes (or all
    /// sub-attributes if none are marked), in schema order.
    pub fn hash(&self) -> u64 {
        if self.unassigned() {
            return 0;
        }
        let identity_names: Vec<&str> = self
            .attribute
            .identity_sub_attributes()
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        let hashes: Vec<u64> = identity_names
            .iter()
            .filter_map(|name| self.child(name))
            .map(Property::hash)
            .collect();
        combine_ordered(&hashes)
    }
}
