//! The "bcrypt" pipeline row (spec §4.I): properties with password semantics
//! (`writeOnly`, never returned) are hashed before they reach storage.

use crate::error::{ScimError, ScimResult};
use crate::pipeline::{FilterContext, ResourceFilter};
use crate::property::{Property, Value};
use crate::resource::Resource;
use crate::schema::{Attribute, AttributeType, Mutability, Returned};

pub struct BcryptFilter {
    pub cost: u32,
}

impl ResourceFilter for BcryptFilter {
    fn apply(
        &self,
        _ctx: &FilterContext,
        resource: &mut Resource,
        reference: Option<&Resource>,
    ) -> ScimResult<()> {
        hash_passwords(&mut resource.root, reference.map(|r| &r.root), self.cost)
    }
}

fn is_password_attribute(attribute: &Attribute) -> bool {
    attribute.mutability == Mutability::WriteOnly
        && attribute.returned == Returned::Never
        && attribute.data_type == AttributeType::String
}

fn hash_passwords(property: &mut Property, reference: Option<&Property>, cost: u32) -> ScimResult<()> {
    if is_password_attribute(property.attribute()) {
        if let Value::String(plaintext) = property.value() {
            let unchanged = matches!(
                reference.map(Property::value),
                Some(Value::String(prior)) if prior == plaintext
            );
            if !unchanged {
                let hashed = bcrypt::hash(&plaintext, cost)
                    .map_err(|e| ScimError::internal(format!("bcrypt hash failed: {e}")))?;
                property.set(Value::String(hashed))?;
            }
        }
        return Ok(());
    }

    match property {
        Property::Complex(c) => {
            let ref_complex = reference.and_then(Property::as_complex);
            for (i, child) in c.children_mut().iter_mut().enumerate() {
                let ref_child = ref_complex.and_then(|r| r.child_at(i));
                hash_passwords(child, ref_child, cost)?;
            }
        }
        Property::MultiValued(m) => {
            let ref_multi = reference.and_then(Property::as_multi_valued);
            for i in 0..m.len() {
                let ref_element = ref_multi.and_then(|r| r.element_at(i));
                hash_passwords(m.element_at_mut(i).unwrap(), ref_element, cost)?;
            }
        }
        Property::Simple(_) => {}
    }
    Ok(())
}
