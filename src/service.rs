//! The service façade (spec §4.J, module J): the single entry point that
//! wires the JSON codec, the resource-filter pipeline, the patch engine, and
//! a [`Database`] collaborator into the five SCIM operations (spec §6
//! "Operations").
//!
//! Everything HTTP-shaped — routing, header parsing, status-code mapping —
//! stays outside this module; callers hand in raw bodies and conditional
//! headers and get back [`Resource`]s, [`ScimError`]s, and rendered bytes.

use std::sync::Arc;

use crate::database::{Database, Pagination, Sort, SortOrder};
use crate::error::{ScimError, ScimResult};
use crate::json::{deserialize, serialize, Projection};
use crate::patch;
use crate::patch::PatchRequest;
use crate::path::parse_filter;
use crate::pipeline::{content_hash, FilterContext, Operation, Pipeline};
use crate::resource::Resource;
use crate::schema::{ResourceType, UrnRegistry};
use crate::version::ScimVersion;

/// A parsed `If-Match`/`If-None-Match` header value (spec §5 "Optimistic
/// concurrency"): either the wildcard `*` or a comma-separated list of
/// ETags.
#[derive(Debug, Clone)]
pub enum ETagPrecondition {
    Any,
    OneOf(Vec<ScimVersion>),
}

impl ETagPrecondition {
    pub fn parse(header_value: &str) -> Option<Self> {
        let trimmed = header_value.trim();
        if trimmed == "*" {
            return Some(Self::Any);
        }
        let versions: Vec<ScimVersion> = trimmed
            .split(',')
            .filter_map(|v| ScimVersion::parse_http_header(v.trim()))
            .collect();
        if versions.is_empty() {
            None
        } else {
            Some(Self::OneOf(versions))
        }
    }

    fn matches(&self, current: &ScimVersion) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(versions) => versions.iter().any(|v| v.matches(current)),
        }
    }
}

/// The two conditional-request headers a caller may supply, `If-Match`
/// taking precedence over `If-None-Match` when both are present.
#[derive(Debug, Clone, Default)]
pub struct Conditional {
    pub if_match: Option<ETagPrecondition>,
    pub if_none_match: Option<ETagPrecondition>,
}

impl Conditional {
    pub fn none() -> Self {
        Self::default()
    }

    fn check(&self, current: &ScimVersion) -> ScimResult<()> {
        if let Some(if_match) = &self.if_match {
            return if if_match.matches(current) {
                Ok(())
            } else {
                Err(ScimError::conflict("If-Match precondition failed"))
            };
        }
        if let Some(if_none_match) = &self.if_none_match {
            if if_none_match.matches(current) {
                return Err(ScimError::conflict("If-None-Match precondition failed"));
            }
        }
        Ok(())
    }
}

/// A list/search query (spec §6 "Query"), already decoded from whatever
/// transport carried it (query string or a POST `.search` body).
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filter: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub start_index: Option<usize>,
    pub count: Option<usize>,
    pub attributes: Option<String>,
    pub excluded_attributes: Option<String>,
}

/// The result of [`Service::query`]: the matched page plus the projection
/// it was read under, so the caller can render it with [`Service::render`]
/// or [`Service::render_list`].
pub struct QueryResult {
    pub resources: Vec<Resource>,
    pub total_results: usize,
    pub start_index: usize,
    pub projection: Projection,
}

/// Tunable parameters for a [`Service`]: constructed with a base URL and
/// refined with `with_*` builder methods rather than a struct literal, so
/// new knobs can be added without breaking callers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub bcrypt_cost: u32,
    pub max_results: usize,
}

impl EngineConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            max_results: 200,
        }
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// Coordinates the pipeline, patch engine, and codec over one resource type
/// and one [`Database`] (spec §4.J).
pub struct Service<D: Database> {
    pub resource_type: Arc<ResourceType>,
    pub database: D,
    pub urns: UrnRegistry,
    pub base_url: String,
    pub bcrypt_cost: u32,
    pub max_results: usize,
}

impl<D: Database> Service<D> {
    /// Builds a service with default tuning (see [`EngineConfig::new`]).
    pub fn new(resource_type: Arc<ResourceType>, database: D, urns: UrnRegistry, base_url: impl Into<String>) -> Self {
        Self::with_config(resource_type, database, urns, EngineConfig::new(base_url))
    }

    pub fn with_config(resource_type: Arc<ResourceType>, database: D, urns: UrnRegistry, config: EngineConfig) -> Self {
        Self {
            resource_type,
            database,
            urns,
            base_url: config.base_url,
            bcrypt_cost: config.bcrypt_cost,
            max_results: config.max_results,
        }
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::standard(self.bcrypt_cost)
    }

    fn ctx(&self, operation: Operation) -> FilterContext {
        FilterContext {
            operation,
            bcrypt_cost: self.bcrypt_cost,
            base_url: self.base_url.clone(),
        }
    }

    fn db_error<E: std::error::Error>(e: E) -> ScimError {
        ScimError::internal(e.to_string())
    }

    /// Creates a resource: deserialize, run the pipeline, validate, persist
    /// (spec §6 "Create").
    pub async fn create(&self, body: &[u8]) -> ScimResult<Resource> {
        let mut resource = deserialize(Arc::clone(&self.resource_type), body)?;
        self.pipeline()
            .run(&self.ctx(Operation::Create), &mut resource, None)?;
        crate::pipeline::validate(&self.ctx(Operation::Create), &resource, None, &self.database).await?;
        self.database
            .insert(&self.resource_type.name, resource)
            .await
            .map_err(Self::db_error)
    }

    /// Fetches a resource by id, raising `notFound` if it doesn't exist
    /// (spec §6 "Get").
    pub async fn get(&self, id: &str) -> ScimResult<Resource> {
        self.database
            .get(&self.resource_type.name, id)
            .await
            .map_err(Self::db_error)?
            .ok_or_else(|| ScimError::not_found(self.resource_type.name.as_str(), id))
    }

    /// Replaces a resource wholesale (spec §6 "Replace"). `precondition` is
    /// checked against the resource's current version before anything is
    /// written.
    pub async fn replace(&self, id: &str, body: &[u8], precondition: &Conditional) -> ScimResult<Resource> {
        let reference = self.get(id).await?;
        if let Some(version) = reference.version() {
            precondition.check(&version)?;
        }
        let mut resource = deserialize(Arc::clone(&self.resource_type), body)?;
        self.pipeline()
            .run(&self.ctx(Operation::Replace), &mut resource, Some(&reference))?;
        crate::pipeline::validate(&self.ctx(Operation::Replace), &resource, Some(&reference), &self.database)
            .await?;
        if content_hash(&resource) == content_hash(&reference) {
            return Ok(reference);
        }
        self.database
            .replace(&self.resource_type.name, id, resource)
            .await
            .map_err(Self::db_error)
    }

    /// Applies a PatchOp request (spec §6 "Patch"), returning the resulting
    /// resource and whether anything of substance changed (idempotence per
    /// spec §4.H).
    pub async fn patch(&self, id: &str, body: &[u8], precondition: &Conditional) -> ScimResult<(Resource, bool)> {
        let reference = self.get(id).await?;
        if let Some(version) = reference.version() {
            precondition.check(&version)?;
        }
        let request = PatchRequest::parse(body)?;
        let mut resource = reference.clone_deep();
        patch::apply(&mut resource, &request, &self.urns)?;
        self.pipeline()
            .run(&self.ctx(Operation::Patch), &mut resource, Some(&reference))?;
        crate::pipeline::validate(&self.ctx(Operation::Patch), &resource, Some(&reference), &self.database)
            .await?;
        if content_hash(&resource) == content_hash(&reference) {
            return Ok((reference, false));
        }
        let persisted = self
            .database
            .replace(&self.resource_type.name, id, resource)
            .await
            .map_err(Self::db_error)?;
        Ok((persisted, true))
    }

    /// Deletes a resource (spec §6 "Delete"), honoring the same conditional
    /// headers as replace/patch.
    pub async fn delete(&self, id: &str, precondition: &Conditional) -> ScimResult<()> {
        let reference = self.get(id).await?;
        if let Some(version) = reference.version() {
            precondition.check(&version)?;
        }
        self.database
            .delete(&self.resource_type.name, id)
            .await
            .map_err(Self::db_error)
    }

    /// Lists/searches resources (spec §6 "Query"), enforcing the server's
    /// maximum page size and the `attributes`/`excludedAttributes`
    /// projection.
    pub async fn query(&self, query: &ListQuery) -> ScimResult<QueryResult> {
        let filter = query.filter.as_deref().map(parse_filter).transpose()?;
        let sort = query.sort_by.clone().map(|path| Sort {
            path,
            order: query.sort_order.unwrap_or(SortOrder::Ascending),
        });
        let page = Pagination {
            start_index: query.start_index.unwrap_or(1).max(1),
            count: query.count.unwrap_or(100),
        };
        if page.count > self.max_results {
            return Err(ScimError::too_many(format!(
                "requested count {} exceeds the maximum of {}",
                page.count, self.max_results
            )));
        }
        let projection =
            Projection::from_query_params(query.attributes.as_deref(), query.excluded_attributes.as_deref())?;

        let total_results = self
            .database
            .count(&self.resource_type.name, filter.as_ref())
            .await
            .map_err(Self::db_error)?;
        let resources = self
            .database
            .query(&self.resource_type.name, filter.as_ref(), sort.as_ref(), page)
            .await
            .map_err(Self::db_error)?;

        Ok(QueryResult {
            resources,
            total_results,
            start_index: page.start_index,
            projection,
        })
    }

    /// Renders one resource as a SCIM JSON body under `projection`.
    pub fn render(&self, resource: &Resource, projection: &Projection) -> ScimResult<Vec<u8>> {
        serialize(resource, projection)
    }

    /// Renders a [`QueryResult`] as a `ListResponse` envelope (RFC 7644
    /// §3.4.2), each member serialized under the query's own projection.
    pub fn render_list(&self, result: &QueryResult) -> ScimResult<Vec<u8>> {
        let mut members = Vec::with_capacity(result.resources.len());
        for resource in &result.resources {
            let bytes = serialize(resource, &result.projection)?;
            members.push(serde_json::from_slice(&bytes)?);
        }
        let body = serde_json::json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:ListResponse"],
            "totalResults": result.total_results,
            "startIndex": result.start_index,
            "itemsPerPage": result.resources.len(),
            "Resources": members,
        });
        Ok(crate::json::serializer::write_json_value(&body))
    }
}
