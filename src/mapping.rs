//! Reflection-free bindings between the property tree and user-defined
//! model types (spec §9 "Reflection-free access"): explicit
//! `getter(model) -> value` / `setter(property, model)` closures per
//! attribute, never runtime type introspection. Unused by default — the
//! engine's own create/replace/patch/query path never touches this module;
//! it exists for integrators who keep a typed model alongside the property
//! tree and want one declarative place to keep the two in sync.

use std::collections::HashMap;

use crate::property::{Property, Value};

/// One attribute's binding to model type `M`: reads `M` into a [`Value`]
/// the property tree can hold, and writes a [`Property`]'s value back onto
/// `M`.
pub struct Mapping<M> {
    getter: Box<dyn Fn(&M) -> Value + Send + Sync>,
    setter: Box<dyn Fn(&mut M, &Property) + Send + Sync>,
}

impl<M> Mapping<M> {
    pub fn new(
        getter: impl Fn(&M) -> Value + Send + Sync + 'static,
        setter: impl Fn(&mut M, &Property) + Send + Sync + 'static,
    ) -> Self {
        Self {
            getter: Box::new(getter),
            setter: Box::new(setter),
        }
    }

    pub fn get(&self, model: &M) -> Value {
        (self.getter)(model)
    }

    pub fn set(&self, model: &mut M, property: &Property) {
        (self.setter)(model, property)
    }
}

/// A named collection of [`Mapping`]s for one model type, keyed by
/// top-level attribute name, built once at startup and treated as
/// read-only afterwards (spec §9 "Global state").
pub struct MappingRegistry<M> {
    mappings: HashMap<String, Mapping<M>>,
}

impl<M> MappingRegistry<M> {
    pub fn new() -> Self {
        Self {
            mappings: HashMap::new(),
        }
    }

    pub fn register(&mut self, attribute_name: impl Into<String>, mapping: Mapping<M>) {
        self.mappings.insert(attribute_name.into(), mapping);
    }

    pub fn get(&self, attribute_name: &str) -> Option<&Mapping<M>> {
        self.mappings.get(attribute_name)
    }
}

impl<M> Default for MappingRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LegacyUser {
        login: String,
        disabled: bool,
    }

    #[test]
    fn getter_reads_model_field_as_a_value() {
        let mapping = Mapping::new(
            |m: &LegacyUser| Value::String(m.login.clone()),
            |m: &mut LegacyUser, p: &Property| {
                if let Value::String(s) = p.value() {
                    m.login = s;
                }
            },
        );
        let user = LegacyUser {
            login: "imulab".into(),
            disabled: false,
        };
        assert_eq!(mapping.get(&user), Value::String("imulab".into()));
    }

    #[test]
    fn registry_looks_up_by_attribute_name() {
        let mut registry: MappingRegistry<LegacyUser> = MappingRegistry::new();
        registry.register(
            "active",
            Mapping::new(
                |m: &LegacyUser| Value::Boolean(!m.disabled),
                |m: &mut LegacyUser, p: &Property| {
                    if let Value::Boolean(b) = p.value() {
                        m.disabled = !b;
                    }
                },
            ),
        );
        assert!(registry.get("active").is_some());
        assert!(registry.get("userName").is_none());
    }
}
