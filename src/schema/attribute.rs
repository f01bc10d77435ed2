//! Immutable attribute descriptors and their builder.

use std::sync::Arc;

use super::types::{AttributeType, Mutability, Returned, Uniqueness};
use crate::error::ScimError;

/// An immutable descriptor of one SCIM attribute (spec §3 "Attribute").
///
/// Attributes are shared by reference (`Arc`) across every [`crate::property::Property`]
/// bound to them; their lifetime exceeds any one property tree.
#[derive(Debug)]
pub struct Attribute {
    pub name: String,
    pub data_type: AttributeType,
    pub multi_valued: bool,
    pub required: bool,
    pub case_exact: bool,
    pub mutability: Mutability,
    pub returned: Returned,
    pub uniqueness: Uniqueness,
    pub canonical_values: Vec<String>,
    pub reference_types: Vec<String>,
    pub sub_attributes: Vec<Arc<Attribute>>,
    /// A singular boolean sub-attribute of a multiValued complex attribute
    /// that guards primary-element exclusivity (spec §3 invariant 3).
    pub primary: bool,
    /// A singular non-complex sub-attribute that participates in identity
    /// hashing (spec §3 invariant 5).
    pub identity: bool,
}

impl Attribute {
    /// Case-insensitive lookup of a sub-attribute by name.
    pub fn sub_attribute(&self, name: &str) -> Option<&Arc<Attribute>> {
        self.sub_attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Index of a sub-attribute by case-insensitive name.
    pub fn sub_attribute_index(&self, name: &str) -> Option<usize> {
        self.sub_attributes
            .iter()
            .position(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// The single-valued projection of this attribute: the element schema
    /// worn by each element Property of a multiValued property (spec §3).
    pub fn as_singular(self: &Arc<Self>) -> Arc<Attribute> {
        if !self.multi_valued {
            return Arc::clone(self);
        }
        Arc::new(Attribute {
            name: self.name.clone(),
            data_type: self.data_type,
            multi_valued: false,
            required: self.required,
            case_exact: self.case_exact,
            mutability: self.mutability,
            returned: self.returned,
            uniqueness: self.uniqueness,
            canonical_values: self.canonical_values.clone(),
            reference_types: self.reference_types.clone(),
            sub_attributes: self.sub_attributes.clone(),
            primary: self.primary,
            identity: self.identity,
        })
    }

    /// True for singular, complex sub-attributes with at least one
    /// `identity`-marked child (or, per spec §3 invariant 5, every child
    /// contributes when none are explicitly marked).
    pub fn identity_sub_attributes(&self) -> Vec<&Arc<Attribute>> {
        let marked: Vec<_> = self
            .sub_attributes
            .iter()
            .filter(|a| a.identity)
            .collect();
        if marked.is_empty() {
            self.sub_attributes.iter().collect()
        } else {
            marked
        }
    }
}

/// Builder DSL for [`Attribute`], rejecting illegal characteristic
/// combinations at construction time (spec §4.A).
pub struct AttributeBuilder {
    name: String,
    data_type: AttributeType,
    multi_valued: bool,
    required: bool,
    case_exact: bool,
    mutability: Mutability,
    returned: Returned,
    uniqueness: Uniqueness,
    canonical_values: Vec<String>,
    reference_types: Vec<String>,
    sub_attributes: Vec<Arc<Attribute>>,
    primary: bool,
    identity: bool,
}

impl AttributeBuilder {
    pub fn new(name: impl Into<String>, data_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            data_type,
            multi_valued: false,
            required: false,
            case_exact: false,
            mutability: Mutability::ReadWrite,
            returned: Returned::Default,
            uniqueness: Uniqueness::None,
            canonical_values: Vec::new(),
            reference_types: Vec::new(),
            sub_attributes: Vec::new(),
            primary: false,
            identity: false,
        }
    }

    pub fn multi_valued(mut self, v: bool) -> Self {
        self.multi_valued = v;
        self
    }

    pub fn required(mut self, v: bool) -> Self {
        self.required = v;
        self
    }

    pub fn case_exact(mut self, v: bool) -> Self {
        self.case_exact = v;
        self
    }

    pub fn mutability(mut self, m: Mutability) -> Self {
        self.mutability = m;
        self
    }

    pub fn returned(mut self, r: Returned) -> Self {
        self.returned = r;
        self
    }

    pub fn uniqueness(mut self, u: Uniqueness) -> Self {
        self.uniqueness = u;
        self
    }

    pub fn canonical_values(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.canonical_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn reference_types(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.reference_types = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn sub_attribute(mut self, attr: Arc<Attribute>) -> Self {
        self.sub_attributes.push(attr);
        self
    }

    /// Mark this attribute as the `primary` exclusivity guard of its
    /// multiValued complex parent. Only legal on a singular boolean.
    pub fn primary(mut self, v: bool) -> Self {
        self.primary = v;
        self
    }

    /// Mark this sub-attribute as contributing to identity hashing.
    pub fn identity(mut self, v: bool) -> Self {
        self.identity = v;
        self
    }

    pub fn build(self) -> Result<Arc<Attribute>, ScimError> {
        if !self.canonical_values.is_empty() && self.data_type != AttributeType::String {
            return Err(ScimError::invalid_syntax(format!(
                "attribute '{}': canonicalValues only apply to string attributes",
                self.name
            )));
        }
        if self.case_exact
            && !matches!(
                self.data_type,
                AttributeType::String | AttributeType::Reference
            )
        {
            return Err(ScimError::invalid_syntax(format!(
                "attribute '{}': caseExact only applies to string/reference attributes",
                self.name
            )));
        }
        if !self.reference_types.is_empty() && self.data_type != AttributeType::Reference {
            return Err(ScimError::invalid_syntax(format!(
                "attribute '{}': referenceTypes only apply to reference attributes",
                self.name
            )));
        }
        if !self.sub_attributes.is_empty() && self.data_type != AttributeType::Complex {
            return Err(ScimError::invalid_syntax(format!(
                "attribute '{}': sub-attributes only apply to complex attributes",
                self.name
            )));
        }
        if self.primary && (self.multi_valued || self.data_type != AttributeType::Boolean) {
            return Err(ScimError::invalid_syntax(format!(
                "attribute '{}': primary only applies to a singular boolean sub-attribute",
                self.name
            )));
        }
        if self.identity && (self.multi_valued || self.data_type == AttributeType::Complex) {
            return Err(ScimError::invalid_syntax(format!(
                "attribute '{}': identity only applies to a singular non-complex sub-attribute",
                self.name
            )));
        }

        Ok(Arc::new(Attribute {
            name: self.name,
            data_type: self.data_type,
            multi_valued: self.multi_valued,
            required: self.required,
            case_exact: self.case_exact,
            mutability: self.mutability,
            returned: self.returned,
            uniqueness: self.uniqueness,
            canonical_values: self.canonical_values,
            reference_types: self.reference_types,
            sub_attributes: self.sub_attributes,
            primary: self.primary,
            identity: self.identity,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_values_rejected_on_non_string() {
        let err = AttributeBuilder::new("active", AttributeType::Boolean)
            .canonical_values(["true", "false"])
            .build()
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidSyntax);
    }

    #[test]
    fn primary_rejected_on_multi_valued() {
        let err = AttributeBuilder::new("primary", AttributeType::Boolean)
            .multi_valued(true)
            .primary(true)
            .build()
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidSyntax);
    }

    #[test]
    fn identity_rejected_on_complex() {
        let child = AttributeBuilder::new("value", AttributeType::String)
            .build()
            .unwrap();
        let err = AttributeBuilder::new("name", AttributeType::Complex)
            .sub_attribute(child)
            .identity(true)
            .build()
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ScimErrorKind::InvalidSyntax);
    }

    #[test]
    fn valid_complex_attribute_builds() {
        let value = AttributeBuilder::new("value", AttributeType::String)
            .identity(true)
            .build()
            .unwrap();
        let primary = AttributeBuilder::new("primary", AttributeType::Boolean)
            .primary(true)
            .build()
            .unwrap();
        let emails = AttributeBuilder::new("emails", AttributeType::Complex)
            .multi_valued(true)
            .sub_attribute(value)
            .sub_attribute(primary)
            .build()
            .unwrap();
        assert_eq!(emails.sub_attributes.len(), 2);
    }
}
