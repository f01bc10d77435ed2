//! The navigator: a stateful cursor over a property tree (spec §4.C,
//! module C).

use crate::error::ScimError;
use crate::property::{Index, Property, Value};

/// One step taken from the root, replayed against `&mut Property` on every
/// `current`/`current_mut` call rather than cached as a pointer.
#[derive(Debug, Clone)]
enum Segment {
    Name(String),
    Position(usize),
}

impl Segment {
    fn as_index(&self) -> Index<'_> {
        match self {
            Segment::Name(name) => Index::Name(name),
            Segment::Position(i) => Index::Position(*i),
        }
    }
}

/// A cursor that descends into a [`Property`] tree one frame at a time.
///
/// Navigation failures are sticky: once an error is recorded, subsequent
/// `dot`/`at`/`where_` calls are no-ops until [`Navigator::clear_error`] is
/// called.
pub struct Navigator<'a> {
    root: &'a mut Property,
    path: Vec<Segment>,
    error: Option<ScimError>,
}

impl<'a> Navigator<'a> {
    pub fn new(source: &'a mut Property) -> Self {
        Self {
            root: source,
            path: Vec::new(),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&ScimError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) -> &mut Self {
        self.error = None;
        self
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn source(&self) -> &Property {
        &*self.root
    }

    pub fn current(&self) -> &Property {
        let mut node = &*self.root;
        for segment in &self.path {
            node = node
                .by_index(segment.as_index())
                .expect("every recorded segment was verified to exist when pushed");
        }
        node
    }

    fn current_mut(&mut self) -> &mut Property {
        let mut node = &mut *self.root;
        for segment in &self.path {
            node = node
                .by_index_mut(segment.as_index())
                .expect("every recorded segment was verified to exist when pushed");
        }
        node
    }

    /// Mutable access to the current position when it is a multiValued
    /// property, for callers (the patch engine's `remove`) that mutate the
    /// element list directly rather than through `add`/`set`/`delete`.
    pub fn current_multi_valued_mut(&mut self) -> Option<&mut crate::property::MultiValuedProperty> {
        self.current_mut().as_multi_valued_mut()
    }

    pub fn dot(&mut self, name: &str) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        if self.current().by_index(Index::Name(name)).is_some() {
            self.path.push(Segment::Name(name.to_string()));
        } else {
            self.error = Some(ScimError::invalid_path(format!(
                "unknown sub-attribute '{name}'"
            )));
        }
        self
    }

    pub fn at(&mut self, index: usize) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        if self.current().by_index(Index::Position(index)).is_some() {
            self.path.push(Segment::Position(index));
        } else {
            self.error = Some(ScimError::no_target(format!("index {index} out of range")));
        }
        self
    }

    pub fn where_(&mut self, pred: impl Fn(&Property) -> bool) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        let segment = match self.current() {
            Property::Complex(c) => c
                .children()
                .iter()
                .find(|p| pred(p))
                .map(|p| Segment::Name(p.attribute().name.clone())),
            Property::MultiValued(m) => m
                .elements()
                .iter()
                .position(|p| pred(p))
                .map(Segment::Position),
            Property::Simple(_) => None,
        };
        match segment {
            Some(segment) => self.path.push(segment),
            None => self.error = Some(ScimError::no_target("no child matched predicate")),
        }
        self
    }

    pub fn retract(&mut self) -> &mut Self {
        self.path.pop();
        self
    }

    pub fn add(&mut self, v: Value) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(e) = self.current_mut().add(v) {
            self.error = Some(e);
        }
        self
    }

    pub fn replace(&mut self, v: Value) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(e) = self.current_mut().set(v) {
            self.error = Some(e);
        }
        self
    }

    pub fn delete(&mut self) -> &mut Self {
        if self.error.is_some() {
            return self;
        }
        self.current_mut().delete();
        self
    }
}
