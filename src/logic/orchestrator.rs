use std::sync::Arc;

use crate::error::{BindResult, BindingError};
use crate::logic::matcher::{match_params, PendingBinding};
use crate::logic::registry::{BindingRegistry, HandlerId};
use crate::logic::resolver::resolve_model;
use crate::model::{
    BindableModel, BindingSlot, BoundInstance, ParsedRoute, RequestContext, RouteParamDescriptor,
};
use crate::store::ModelStore;

/// The value a slot ends up holding.
#[derive(Debug, Clone)]
pub enum BoundValue {
    Raw(String),
    Model(BoundInstance),
}

/// A route parameter after resolution. Lives for one request only.
#[derive(Debug, Clone)]
pub struct ResolvedBinding {
    pub param: RouteParamDescriptor,
    pub slot: BindingSlot,
    pub raw_value: String,
    pub value: BoundValue,
}

/// Arguments for a bound handler: the request context first, then one value
/// per slot in declaration order.
#[derive(Debug, Clone)]
pub struct BoundArgs {
    context: RequestContext,
    bindings: Vec<ResolvedBinding>,
}

impl BoundArgs {
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn bindings(&self) -> &[ResolvedBinding] {
        &self.bindings
    }

    pub fn value(&self, position: usize) -> Option<&BoundValue> {
        self.bindings.get(position).map(|binding| &binding.value)
    }

    /// The raw route value bound at `position`
    pub fn raw(&self, position: usize) -> BindResult<&str> {
        match self.value(position) {
            Some(BoundValue::Raw(value)) => Ok(value),
            other => Err(self.mismatch(position, "raw value", other)),
        }
    }

    /// The model instance bound at `position`
    pub fn model<T: BindableModel>(&self, position: usize) -> BindResult<Arc<T>> {
        match self.value(position) {
            Some(BoundValue::Model(instance)) => instance
                .downcast::<T>()
                .ok_or_else(|| self.mismatch(position, T::NAME, self.value(position))),
            other => Err(self.mismatch(position, T::NAME, other)),
        }
    }

    fn mismatch(&self, position: usize, expected: &str, found: Option<&BoundValue>) -> BindingError {
        let found = match found {
            None => "nothing".to_string(),
            Some(BoundValue::Raw(_)) => "raw value".to_string(),
            Some(BoundValue::Model(instance)) => instance.model_name().to_string(),
        };
        BindingError::TypeMismatch {
            position,
            expected: expected.to_string(),
            found,
        }
    }
}

/// Where a request is in the binding process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Matched,
    Resolving(usize),
    Resolved,
    NotFound,
    ConfigError,
    StoreError,
}

impl BindingState {
    fn after_failure(err: &BindingError) -> Self {
        if err.is_not_found() {
            BindingState::NotFound
        } else if err.is_store() {
            BindingState::StoreError
        } else {
            BindingState::ConfigError
        }
    }
}

/// Drives binding for one request: match slots, then resolve them strictly
/// left to right so scoped slots can see their parent.
pub struct BindingEngine {
    registry: Arc<BindingRegistry>,
    store: Arc<dyn ModelStore>,
}

impl BindingEngine {
    /// Build an engine and seal the registry; metadata is read-only from here on.
    pub fn new(registry: Arc<BindingRegistry>, store: Arc<dyn ModelStore>) -> Self {
        registry.seal();
        Self { registry, store }
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn store(&self) -> Arc<dyn ModelStore> {
        self.store.clone()
    }

    /// Bind a request's route values for `handler`.
    ///
    /// Returns `Ok(None)` when the handler has no binding metadata, in which
    /// case the request passes through untouched.
    pub async fn bind(
        &self,
        handler: &HandlerId,
        route: &ParsedRoute,
        values: Vec<String>,
        context: RequestContext,
    ) -> BindResult<Option<BoundArgs>> {
        let Some(slots) = self.registry.lookup(handler) else {
            return Ok(None);
        };

        let mut state = BindingState::Matched;
        log::debug!("{} {} {:?}", handler, route.pattern, state);

        let result = self.resolve_all(handler, route, &slots, values, &context, &mut state).await;
        let bindings = match result {
            Ok(bindings) => bindings,
            Err(err) => {
                let failed = BindingState::after_failure(&err);
                log::debug!("{} {} {:?} -> {:?}", handler, route.pattern, state, failed);
                return Err(err);
            }
        };

        log::debug!("{} {} {:?}", handler, route.pattern, BindingState::Resolved);
        Ok(Some(BoundArgs { context, bindings }))
    }

    async fn resolve_all(
        &self,
        handler: &HandlerId,
        route: &ParsedRoute,
        slots: &[BindingSlot],
        values: Vec<String>,
        context: &RequestContext,
        state: &mut BindingState,
    ) -> BindResult<Vec<ResolvedBinding>> {
        let pending = match_params(route, handler, slots, values)?;
        let mut bindings: Vec<ResolvedBinding> = Vec::with_capacity(pending.len());

        // Sequential on purpose: a scoped slot needs its parent resolved first.
        for (index, binding) in pending.into_iter().enumerate() {
            *state = BindingState::Resolving(index);

            let resolved = match binding {
                PendingBinding::Raw { param, slot, value } => ResolvedBinding {
                    param,
                    slot,
                    raw_value: value.clone(),
                    value: BoundValue::Raw(value),
                },
                PendingBinding::Model {
                    param,
                    slot,
                    value,
                    model,
                    parent,
                } => {
                    let parent = match parent.map(|parent| &bindings[parent].value) {
                        None => None,
                        Some(BoundValue::Model(instance)) => Some(instance),
                        Some(BoundValue::Raw(_)) => {
                            return Err(BindingError::InvalidScope {
                                param: param.original_literal.clone(),
                            })
                        }
                    };
                    let instance =
                        resolve_model(&model, &param, &value, context, parent, index).await?;
                    ResolvedBinding {
                        param,
                        slot,
                        raw_value: value,
                        value: BoundValue::Model(instance),
                    }
                }
            };
            bindings.push(resolved);
        }

        Ok(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::route_params::parse_route;
    use crate::model::{Comment, Post, SlotKind, Slots};
    use crate::store::mem::RecordingStore;
    use crate::store::{LookupQuery, MemoryStore, Record, SeedStore};
    use async_trait::async_trait;
    use axum::http::{HeaderMap, Method, Uri};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    async fn blog_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert("authors", record(json!({"id": 1, "username": "ada", "display_name": "Ada"})))
            .await
            .unwrap();
        store
            .insert("posts", record(json!({"id": 1, "author_id": 1, "slug": "engines", "title": "Engines", "body": "", "published": true, "created_at": "2024-01-01T00:00:00Z"})))
            .await
            .unwrap();
        store
            .insert("comments", record(json!({"id": 2, "post_id": 1, "code": "c-2", "body": "hi"})))
            .await
            .unwrap();
        store
            .insert("comments", record(json!({"id": 3, "post_id": 7, "code": "c-3", "body": "elsewhere"})))
            .await
            .unwrap();
        store
    }

    fn engine(registry: BindingRegistry, store: Arc<dyn ModelStore>) -> BindingEngine {
        BindingEngine::new(Arc::new(registry), store)
    }

    fn context(engine: &BindingEngine, route: &ParsedRoute) -> RequestContext {
        RequestContext::new(
            Method::GET,
            Uri::from_static("/"),
            HeaderMap::new(),
            &route.pattern,
            engine.store(),
        )
    }

    fn values(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unregistered_handler_passes_through() {
        let engine = engine(BindingRegistry::new(), Arc::new(MemoryStore::new()));
        let route = parse_route("/posts/:post").unwrap();

        let args = engine
            .bind(&"posts.show".into(), &route, values(&["1"]), context(&engine, &route))
            .await
            .unwrap();
        assert!(args.is_none());
    }

    #[tokio::test]
    async fn test_independent_lookups_in_order() {
        let store = Arc::new(RecordingStore::new(blog_store().await));
        let registry = BindingRegistry::new();
        registry
            .register("comments.show", Slots::new().model::<Post>().model::<Comment>())
            .unwrap();
        let engine = engine(registry, store.clone());
        let route = parse_route("/posts/:post/comments/:comment").unwrap();

        let args = engine
            .bind(&"comments.show".into(), &route, values(&["1", "2"]), context(&engine, &route))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            store.queries(),
            vec![
                LookupQuery::by_key("posts", "id", "1").limit(2),
                LookupQuery::by_key("comments", "id", "2").limit(2),
            ]
        );
        assert_eq!(args.len(), 2);
        assert_eq!(args.model::<Post>(0).unwrap().id, 1);
        assert_eq!(args.model::<Comment>(1).unwrap().id, 2);
        assert_eq!(args.context().route(), "/posts/:post/comments/:comment");
    }

    #[tokio::test]
    async fn test_scoped_lookup_uses_parent_relationship() {
        let store = Arc::new(RecordingStore::new(blog_store().await));
        let registry = BindingRegistry::new();
        registry
            .register("comments.show", Slots::new().model::<Post>().model::<Comment>())
            .unwrap();
        let engine = engine(registry, store.clone());
        let route = parse_route("/posts/:post/comments/:>comment").unwrap();

        let args = engine
            .bind(&"comments.show".into(), &route, values(&["1", "2"]), context(&engine, &route))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.model::<Comment>(1).unwrap().code, "c-2");
        assert_eq!(
            store.queries()[1],
            LookupQuery::by_key("comments", "id", "2")
                .scoped_to("post_id", "1")
                .limit(2)
        );

        // Comment 3 exists, under another post
        let err = engine
            .bind(&"comments.show".into(), &route, values(&["1", "3"]), context(&engine, &route))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_scope_reaches_past_raw_slot() {
        let store = Arc::new(RecordingStore::new(blog_store().await));
        let registry = BindingRegistry::new();
        registry
            .register(
                "comments.versioned",
                Slots::new().model::<Post>().raw().model::<Comment>(),
            )
            .unwrap();
        let engine = engine(registry, store.clone());
        let route = parse_route("/posts/:post/v/:version/comments/:>comment").unwrap();

        let args = engine
            .bind(
                &"comments.versioned".into(),
                &route,
                values(&["1", "v2", "2"]),
                context(&engine, &route),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.raw(1).unwrap(), "v2");
        assert_eq!(args.model::<Comment>(2).unwrap().code, "c-2");
        assert_eq!(args.bindings()[2].param.parent_name.as_deref(), Some("post"));
        assert!(args.bindings()[2].slot.is_model());
        assert_eq!(
            store.queries()[1],
            LookupQuery::by_key("comments", "id", "2")
                .scoped_to("post_id", "1")
                .limit(2)
        );

        let err = engine
            .bind(
                &"comments.versioned".into(),
                &route,
                values(&["1", "v2", "3"]),
                context(&engine, &route),
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_scoped_lookup_without_relationship_is_config_error() {
        let registry = BindingRegistry::new();
        registry
            .register("replies.show", Slots::new().model::<Comment>().model::<Comment>())
            .unwrap();
        let engine = engine(registry, Arc::new(blog_store().await));
        let route = parse_route("/comments/:comment/replies/:>reply").unwrap();

        // Comment declares no replies relationship even though comment 3 exists
        let err = engine
            .bind(&"replies.show".into(), &route, values(&["2", "3"]), context(&engine, &route))
            .await
            .unwrap_err();
        assert!(matches!(err, BindingError::MissingRelationship { .. }));
    }

    #[tokio::test]
    async fn test_slot_count_mismatch_fails_every_time() {
        let registry = BindingRegistry::new();
        registry
            .register("short", Slots::new().model::<Post>().model::<Comment>())
            .unwrap();
        let engine = engine(registry, Arc::new(blog_store().await));
        let route = parse_route("/a/:a/b/:b/c/:c").unwrap();

        for _ in 0..2 {
            let err = engine
                .bind(&"short".into(), &route, values(&["1", "2", "3"]), context(&engine, &route))
                .await
                .unwrap_err();
            assert!(matches!(err, BindingError::ParamCountMismatch { .. }));
        }
    }

    #[tokio::test]
    async fn test_raw_slot_is_passed_through() {
        let store = Arc::new(RecordingStore::new(blog_store().await));
        let registry = BindingRegistry::new();
        registry
            .register("versioned", Slots::new().raw().model::<Post>())
            .unwrap();
        let engine = engine(registry, store.clone());
        let route = parse_route("/api/:version/posts/:post").unwrap();

        let args = engine
            .bind(&"versioned".into(), &route, values(&["v2", "1"]), context(&engine, &route))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.raw(0).unwrap(), "v2");
        assert_eq!(args.model::<Post>(1).unwrap().id, 1);
        assert_eq!(store.queries().len(), 1);

        assert!(matches!(
            args.model::<Post>(0),
            Err(BindingError::TypeMismatch { position: 0, .. })
        ));
        assert!(args.raw(1).is_err());
        assert!(args.raw(5).is_err());
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Gate {
        id: i64,
    }

    #[async_trait]
    impl BindableModel for Gate {
        const NAME: &'static str = "Gate";
        const TABLE: &'static str = "gates";

        async fn find_for_request(
            _ctx: &RequestContext,
            param: &RouteParamDescriptor,
            value: &str,
        ) -> Option<BindResult<Self>> {
            let key = param.lookup_key.resolve(Self::route_key());
            Some(Err(BindingError::not_found(Self::NAME, key, value)))
        }
    }

    #[tokio::test]
    async fn test_override_not_found_short_circuits() {
        let store = Arc::new(RecordingStore::new(blog_store().await));
        let registry = BindingRegistry::new();
        registry
            .register(
                "gated",
                vec![
                    BindingSlot::new(0, SlotKind::model::<Gate>()),
                    BindingSlot::new(1, SlotKind::model::<Post>()),
                ],
            )
            .unwrap();
        let engine = engine(registry, store.clone());
        let route = parse_route("/gates/:gate/posts/:post").unwrap();

        let err = engine
            .bind(&"gated".into(), &route, values(&["1", "1"]), context(&engine, &route))
            .await
            .unwrap_err();
        assert!(matches!(err, BindingError::NotFound { ref key, .. } if key == "id"));
        assert!(store.queries().is_empty());
    }

    #[test]
    fn test_engine_seals_registry() {
        let registry = Arc::new(BindingRegistry::new());
        let _engine = BindingEngine::new(registry.clone(), Arc::new(MemoryStore::new()));
        assert!(registry.is_sealed());
    }

    #[test]
    fn test_failure_states() {
        assert_eq!(
            BindingState::after_failure(&BindingError::not_found("Post", "id", "1")),
            BindingState::NotFound
        );
        assert_eq!(
            BindingState::after_failure(&BindingError::UnknownHandler("x".to_string())),
            BindingState::ConfigError
        );
        assert_eq!(
            BindingState::after_failure(&BindingError::from(anyhow::anyhow!("down"))),
            BindingState::StoreError
        );
    }
}
