//! The `MultiValued` property variant: an ordered, deduplicated,
//! primary-exclusive set of element properties (spec §3 invariants 2-3).

use std::collections::HashSet;
use std::sync::Arc;

use super::hash::combine_unordered;
use super::value::Value;
use super::Property;
use crate::error::ScimError;
use crate::schema::Attribute;

#[derive(Debug, Clone)]
pub struct MultiValuedProperty {
    attribute: Arc<Attribute>,
    element_attribute: Arc<Attribute>,
    elements: Vec<Property>,
}

impl MultiValuedProperty {
    pub fn new(attribute: Arc<Attribute>) -> Self {
        let element_attribute = attribute.as_singular();
        Self {
            attribute,
            element_attribute,
            elements: Vec::new(),
        }
    }

    pub fn attribute(&self) -> &Arc<Attribute> {
        &self.attribute
    }

    pub fn unassigned(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn element_at(&self, index: usize) -> Option<&Property> {
        self.elements.get(index)
    }

    pub fn element_at_mut(&mut self, index: usize) -> Option<&mut Property> {
        self.elements.get_mut(index)
    }

    pub fn elements(&self) -> &[Property] {
        &self.elements
    }

    pub fn iterate(&self, mut f: impl FnMut(&Property)) {
        for e in &self.elements {
            f(e);
        }
    }

    pub fn find(&self, pred: impl Fn(&Property) -> bool) -> Option<&Property> {
        self.elements.iter().find(|e| pred(e))
    }

    /// The element whose `primary` sub-attribute is true, if the element
    /// schema declares one.
    pub fn primary_element(&self) -> Option<&Property> {
        let primary_name = self.primary_sub_attribute_name()?;
        self.elements.iter().find(|e| {
            e.as_complex()
                .and_then(|c| c.child(&primary_name))
                .map(|p| p.value() == Value::Boolean(true))
                .unwrap_or(false)
        })
    }

    fn primary_sub_attribute_name(&self) -> Option<String> {
        self.element_attribute
            .sub_attributes
            .iter()
            .find(|a| a.primary)
            .map(|a| a.name.clone())
    }

    pub fn delete(&mut self) {
        self.elements.clear();
    }

    /// Removes the elements at the positions marked `true` in `matched`,
    /// in place (spec §4.H remove: "when a filter segment is used, selected
    /// elements are removed from the multiValued parent" — the opposite of
    /// traversal's descend-into-match selection semantics).
    ///
    /// # Panics
    /// If `matched.len() != self.elements.len()`.
    pub fn remove_matched(&mut self, matched: &[bool]) {
        assert_eq!(matched.len(), self.elements.len());
        let mut i = 0;
        self.elements.retain(|_| {
            let keep = !matched[i];
            i += 1;
            keep
        });
    }

    pub fn set(&mut self, v: Value) -> Result<(), ScimError> {
        if v.is_null() {
            self.delete();
            return Ok(());
        }
        self.delete();
        self.add(v)
    }

    /// `add(scalar)` appends one element; `add(list)` appends each.
    /// Every append runs the primary-switch guard, then dedup, then
    /// compaction (spec §4.B).
    pub fn add(&mut self, v: Value) -> Result<(), ScimError> {
        match v {
            Value::Null => Ok(()),
            Value::MultiValued(items) => {
                for item in items {
                    self.add_one(item)?;
                }
                Ok(())
            }
            other => self.add_one(other),
        }
    }

    fn add_one(&mut self, v: Value) -> Result<(), ScimError> {
        let mut element = Property::new(Arc::clone(&self.element_attribute));
        element.add(v)?;
        self.elements.push(element);
        self.apply_primary_guard();
        self.dedupe_and_compact();
        Ok(())
    }

    fn apply_primary_guard(&mut self) {
        let Some(primary_name) = self.primary_sub_attribute_name() else {
            return;
        };
        let Some(last_idx) = self.elements.len().checked_sub(1) else {
            return;
        };
        let last_is_primary = self.elements[last_idx]
            .as_complex()
            .and_then(|c| c.child(&primary_name))
            .map(|p| p.value() == Value::Boolean(true))
            .unwrap_or(false);
        if !last_is_primary {
            return;
        }
        for (i, el) in self.elements.iter_mut().enumerate() {
            if i == last_idx {
                continue;
            }
            if let Some(complex) = el.as_complex_mut() {
                if let Some(child) = complex.child_mut(&primary_name) {
                    let _ = child.set(Value::Boolean(false));
                }
            }
        }
    }

    fn dedupe_and_compact(&mut self) {
        let mut seen = HashSet::new();
        self.elements.retain(|el| {
            if el.unassigned() {
                return false;
            }
            seen.insert(el.hash())
        });
    }

    pub fn value(&self) -> Value {
        Value::MultiValued(self.elements.iter().map(Property::value).collect())
    }

    pub fn hash(&self) -> u64 {
        combine_unordered(&self.elements.iter().map(Property::hash).collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, AttributeType};

    fn emails_attr() -> Arc<Attribute> {
        AttributeBuilder::new("emails", AttributeType::Complex)
            .multi_valued(true)
            .sub_attribute(
                AttributeBuilder::new("value", AttributeType::String)
                    .identity(true)
                    .build()
                    .unwrap(),
            )
            .sub_attribute(
                AttributeBuilder::new("primary", AttributeType::Boolean)
                    .primary(true)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn email(value: &str, primary: bool) -> Value {
        Value::Complex(vec![
            ("value".into(), Value::String(value.into())),
            ("primary".into(), Value::Boolean(primary)),
        ])
    }

    #[test]
    fn new_primary_flips_previous_primary_false() {
        let mut m = MultiValuedProperty::new(emails_attr());
        m.add(email("a@x", true)).unwrap();
        m.add(email("b@x", true)).unwrap();
        assert_eq!(m.len(), 2);
        let a = m.element_at(0).unwrap().as_complex().unwrap();
        let b = m.element_at(1).unwrap().as_complex().unwrap();
        assert_eq!(a.child("primary").unwrap().value(), Value::Boolean(false));
        assert_eq!(b.child("primary").unwrap().value(), Value::Boolean(true));
    }

    #[test]
    fn duplicate_identity_hash_is_deduplicated() {
        let mut m = MultiValuedProperty::new(emails_attr());
        m.add(email("a@x", false)).unwrap();
        m.add(email("a@x", false)).unwrap();
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn remove_matched_drops_marked_elements() {
        let mut m = MultiValuedProperty::new(emails_attr());
        m.add(email("a@x", false)).unwrap();
        m.add(email("b@x", false)).unwrap();
        m.add(email("c@x", false)).unwrap();
        m.remove_matched(&[false, true, false]);
        assert_eq!(m.len(), 2);
        let remaining: Vec<_> = m
            .elements()
            .iter()
            .map(|e| e.as_complex().unwrap().child("value").unwrap().value())
            .collect();
        assert_eq!(remaining, vec![Value::String("a@x".into()), Value::String("c@x".into())]);
    }

    #[test]
    fn hash_is_order_independent() {
        let mut m1 = MultiValuedProperty::new(emails_attr());
        m1.add(email("a@x", false)).unwrap();
        m1.add(email("b@x", false)).unwrap();
        let mut m2 = MultiValuedProperty::new(emails_attr());
        m2.add(email("b@x", false)).unwrap();
        m2.add(email("a@x", false)).unwrap();
        assert_eq!(m1.hash(), m2.hash());
    }
}
