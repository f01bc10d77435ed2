//! The property tree (spec §3/§4.B, module B): a schema-bound, in-memory
//! representation of one resource's data.
//!
//! [`Property`] is a tagged union over three variants, dispatched without
//! reflection so the hot operations (`hash`, `unassigned`, `add`, `value`)
//! stay cheap (spec §9 "Extensible dispatch over variants").

pub mod complex;
pub mod hash;
pub mod multi_valued;
pub mod simple;
pub mod value;

use std::sync::Arc;

pub use complex::ComplexProperty;
pub use multi_valued::MultiValuedProperty;
pub use simple::SimpleProperty;
pub use value::Value;

use crate::error::ScimError;
use crate::schema::Attribute;

/// An index into a Property's children: a name for `Complex`, a position
/// for `MultiValued` (spec §4.B `byIndex`).
pub enum Index<'a> {
    Name(&'a str),
    Position(usize),
}

impl<'a> From<&'a str> for Index<'a> {
    fn from(s: &'a str) -> Self {
        Index::Name(s)
    }
}

impl From<usize> for Index<'static> {
    fn from(i: usize) -> Self {
        Index::Position(i)
    }
}

#[derive(Debug, Clone)]
pub enum Property {
    Simple(SimpleProperty),
    Complex(ComplexProperty),
    MultiValued(MultiValuedProperty),
}

impl Property {
    /// Allocates a fully-formed, unassigned property of the right variant
    /// for `attribute` (spec §4.A schema factory).
    pub fn new(attribute: Arc<Attribute>) -> Property {
        if attribute.multi_valued {
            Property::MultiValued(MultiValuedProperty::new(attribute))
        } else if attribute.data_type.is_complex() {
            Property::Complex(ComplexProperty::new(attribute))
        } else {
            Property::Simple(SimpleProperty::new(attribute))
        }
    }

    pub fn attribute(&self) -> &Arc<Attribute> {
        match self {
            Property::Simple(p) => p.attribute(),
            Property::Complex(p) => p.attribute(),
            Property::MultiValued(p) => p.attribute(),
        }
    }

    pub fn unassigned(&self) -> bool {
        match self {
            Property::Simple(p) => p.unassigned(),
            Property::Complex(p) => p.unassigned(),
            Property::MultiValued(p) => p.unassigned(),
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Property::Simple(p) => p.value(),
            Property::Complex(p) => p.value(),
            Property::MultiValued(p) => p.value(),
        }
    }

    pub fn set(&mut self, v: Value) -> Result<(), ScimError> {
        match self {
            Property::Simple(p) => p.set(v),
            Property::Complex(p) => p.set(v),
            Property::MultiValued(p) => p.set(v),
        }
    }

    pub fn add(&mut self, v: Value) -> Result<(), ScimError> {
        match self {
            Property::Simple(p) => p.add(v),
            Property::Complex(p) => p.add(v),
            Property::MultiValued(p) => p.add(v),
        }
    }

    pub fn delete(&mut self) {
        match self {
            Property::Simple(p) => p.delete(),
            Property::Complex(p) => p.delete(),
            Property::MultiValued(p) => p.delete(),
        }
    }

    pub fn hash(&self) -> u64 {
        match self {
            Property::Simple(p) => p.hash(),
            Property::Complex(p) => p.hash(),
            Property::MultiValued(p) => p.hash(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Property::Simple(p) => usize::from(!p.unassigned()),
            Property::Complex(p) => p.len(),
            Property::MultiValued(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iterate(&self, f: impl FnMut(&Property)) {
        match self {
            Property::Simple(_) => {}
            Property::Complex(p) => p.iterate(f),
            Property::MultiValued(p) => p.iterate(f),
        }
    }

    pub fn find(&self, pred: impl Fn(&Property) -> bool) -> Option<&Property> {
        match self {
            Property::Simple(_) => None,
            Property::Complex(p) => p.find(pred),
            Property::MultiValued(p) => p.find(pred),
        }
    }

    pub fn by_index<'a>(&self, index: impl Into<Index<'a>>) -> Option<&Property> {
        match (self, index.into()) {
            (Property::Complex(p), Index::Name(name)) => p.child(name),
            (Property::MultiValued(p), Index::Position(i)) => p.element_at(i),
            _ => None,
        }
    }

    pub fn by_index_mut<'a>(&mut self, index: impl Into<Index<'a>>) -> Option<&mut Property> {
        match (self, index.into()) {
            (Property::Complex(p), Index::Name(name)) => p.child_mut(name),
            (Property::MultiValued(p), Index::Position(i)) => p.element_at_mut(i),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&ComplexProperty> {
        match self {
            Property::Complex(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_complex_mut(&mut self) -> Option<&mut ComplexProperty> {
        match self {
            Property::Complex(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_multi_valued(&self) -> Option<&MultiValuedProperty> {
        match self {
            Property::MultiValued(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_multi_valued_mut(&mut self) -> Option<&mut MultiValuedProperty> {
        match self {
            Property::MultiValued(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_simple(&self) -> Option<&SimpleProperty> {
        match self {
            Property::Simple(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeBuilder, AttributeType};

    #[test]
    fn factory_picks_the_right_variant() {
        let simple = AttributeBuilder::new("userName", AttributeType::String)
            .build()
            .unwrap();
        let complex = AttributeBuilder::new("name", AttributeType::Complex)
            .sub_attribute(simple.clone())
            .build()
            .unwrap();
        let multi = AttributeBuilder::new("emails", AttributeType::Complex)
            .multi_valued(true)
            .sub_attribute(simple.clone())
            .build()
            .unwrap();

        assert!(matches!(Property::new(simple), Property::Simple(_)));
        assert!(matches!(Property::new(complex), Property::Complex(_)));
        assert!(matches!(Property::new(multi), Property::MultiValued(_)));
    }

    #[test]
    fn unassigned_property_hashes_to_zero() {
        let attr = AttributeBuilder::new("nickName", AttributeType::String)
            .build()
            .unwrap();
        let p = Property::new(attr);
        assert!(p.unassigned());
        assert_eq!(p.hash(), 0);
    }
}
