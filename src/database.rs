//! The `Database` collaborator trait (spec §6): the storage seam the
//! service façade and the validation filter depend on.
//!
//! Uses native async-fn-in-trait, an associated `Error` type, and no `dyn`
//! object, so the engine never needs the `async-trait` crate and stays
//! generic over any storage backend.

use std::future::Future;

use crate::filter::evaluate;
use crate::path::Expr;
use crate::resource::Resource;

/// Sort direction for a [`Sort`] (spec §6 "Query").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Sort instruction for a [`Database::query`] call.
#[derive(Debug, Clone)]
pub struct Sort {
    pub path: String,
    pub order: SortOrder,
}

/// Pagination window for [`Database::query`] (spec §6 "Query"), 1-indexed
/// per RFC 7644 §3.4.2.4.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub start_index: usize,
    pub count: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            start_index: 1,
            count: 100,
        }
    }
}

/// The storage collaborator the engine depends on for persistence and
/// uniqueness checks (spec §6).
///
/// `resource_type` names the resource type (e.g. `"User"`) rather than
/// carrying a schema reference, so implementations can key storage however
/// they like; the engine itself never needs to round-trip one of its own
/// [`crate::schema::ResourceType`] values through this trait.
pub trait Database {
    type Error: std::error::Error + Send + Sync + 'static;

    fn insert(
        &self,
        resource_type: &str,
        resource: Resource,
    ) -> impl Future<Output = Result<Resource, Self::Error>> + Send;

    fn get(
        &self,
        resource_type: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Resource>, Self::Error>> + Send;

    /// Counts resources of `resource_type` matching `filter` (`None` counts
    /// all), used by the validation filter's uniqueness check and by the
    /// service façade's `totalResults`.
    fn count(
        &self,
        resource_type: &str,
        filter: Option<&Expr>,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;

    fn query(
        &self,
        resource_type: &str,
        filter: Option<&Expr>,
        sort: Option<&Sort>,
        page: Pagination,
    ) -> impl Future<Output = Result<Vec<Resource>, Self::Error>> + Send;

    fn replace(
        &self,
        resource_type: &str,
        id: &str,
        resource: Resource,
    ) -> impl Future<Output = Result<Resource, Self::Error>> + Send;

    fn delete(
        &self,
        resource_type: &str,
        id: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// A minimal in-process [`Database`] over a `Vec`, used by this crate's own
/// tests and as a reference implementation for integrators.
pub mod in_memory {
    use std::convert::Infallible;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct InMemoryDatabase {
        resources: Mutex<Vec<(String, Resource)>>,
    }

    impl InMemoryDatabase {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Database for InMemoryDatabase {
        type Error = Infallible;

        async fn insert(&self, resource_type: &str, resource: Resource) -> Result<Resource, Infallible> {
            let mut guard = self.resources.lock().unwrap();
            guard.push((resource_type.to_string(), resource.clone_deep()));
            Ok(resource)
        }

        async fn get(&self, resource_type: &str, id: &str) -> Result<Option<Resource>, Infallible> {
            let guard = self.resources.lock().unwrap();
            Ok(guard
                .iter()
                .find(|(rt, r)| rt == resource_type && r.id().as_deref() == Some(id))
                .map(|(_, r)| r.clone_deep()))
        }

        async fn count(&self, resource_type: &str, filter: Option<&Expr>) -> Result<usize, Infallible> {
            let guard = self.resources.lock().unwrap();
            Ok(guard
                .iter()
                .filter(|(rt, _)| rt == resource_type)
                .filter(|(_, r)| matches(r, filter))
                .count())
        }

        async fn query(
            &self,
            resource_type: &str,
            filter: Option<&Expr>,
            _sort: Option<&Sort>,
            page: Pagination,
        ) -> Result<Vec<Resource>, Infallible> {
            let guard = self.resources.lock().unwrap();
            let matched: Vec<Resource> = guard
                .iter()
                .filter(|(rt, _)| rt == resource_type)
                .filter(|(_, r)| matches(r, filter))
                .map(|(_, r)| r.clone_deep())
                .collect();
            let start = page.start_index.saturating_sub(1);
            Ok(matched.into_iter().skip(start).take(page.count).collect())
        }

        async fn replace(&self, resource_type: &str, id: &str, resource: Resource) -> Result<Resource, Infallible> {
            let mut guard = self.resources.lock().unwrap();
            if let Some(slot) = guard
                .iter_mut()
                .find(|(rt, r)| rt == resource_type && r.id().as_deref() == Some(id))
            {
                slot.1 = resource.clone_deep();
            }
            Ok(resource)
        }

        async fn delete(&self, resource_type: &str, id: &str) -> Result<(), Infallible> {
            let mut guard = self.resources.lock().unwrap();
            guard.retain(|(rt, r)| !(rt == resource_type && r.id().as_deref() == Some(id)));
            Ok(())
        }
    }

    fn matches(resource: &Resource, filter: Option<&Expr>) -> bool {
        match filter {
            None => true,
            Some(expr) => evaluate(&resource.root, expr).unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::in_memory::InMemoryDatabase;
    use super::*;
    use crate::property::Value;
    use crate::schema::builtin::user_resource_type;
    use std::sync::Arc;

    fn user(username: &str) -> Resource {
        let mut r = Resource::blank(Arc::new(user_resource_type()));
        r.root
            .by_index_mut("userName")
            .unwrap()
            .set(Value::String(username.into()))
            .unwrap();
        r
    }

    #[tokio::test]
    async fn insert_then_get_roundtrips() {
        let db = InMemoryDatabase::new();
        db.insert("User", user("alice")).await.unwrap();
        let found = db.get("User", "missing-id").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn count_matches_resource_type_only() {
        let db = InMemoryDatabase::new();
        db.insert("User", user("alice")).await.unwrap();
        db.insert("User", user("bob")).await.unwrap();
        assert_eq!(db.count("User", None).await.unwrap(), 2);
        assert_eq!(db.count("Group", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn query_paginates() {
        let db = InMemoryDatabase::new();
        for name in ["a", "b", "c"] {
            db.insert("User", user(name)).await.unwrap();
        }
        let page = db
            .query("User", None, None, Pagination { start_index: 2, count: 1 })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }
}
