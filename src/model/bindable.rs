use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::BindResult;
use crate::model::{RequestContext, RouteParamDescriptor};
use crate::store::Record;

/// A model that can be resolved from a route parameter.
///
/// Besides its table, a model may declare any of three lookup capabilities:
/// a default route key, a static finder that replaces the default lookup, and
/// an instance finder used when a scoped child parameter is resolved through
/// this model. Finders return `None` to signal "not declared"; a declared
/// finder must return `Some` with either an instance or `BindingError::NotFound`.
///
/// Finders receive the lookup key unresolved. When it is
/// [`LookupKey::Default`](crate::model::LookupKey::Default) they must resolve it
/// against the appropriate model's route key themselves.
#[async_trait]
pub trait BindableModel: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Display name used in errors and logs
    const NAME: &'static str;
    const TABLE: &'static str;

    /// Column used when a route parameter carries no explicit lookup key
    fn route_key() -> &'static str {
        "id"
    }

    fn relations() -> Vec<Relation> {
        Vec::new()
    }

    async fn find_for_request(
        _ctx: &RequestContext,
        _param: &RouteParamDescriptor,
        _value: &str,
    ) -> Option<BindResult<Self>> {
        None
    }

    async fn find_related_for_request(
        &self,
        _ctx: &RequestContext,
        _param: &RouteParamDescriptor,
        _value: &str,
    ) -> Option<BindResult<BoundInstance>> {
        None
    }
}

#[async_trait]
trait ErasedModel: Send + Sync {
    fn name(&self) -> &'static str;
    fn table(&self) -> &'static str;
    fn route_key(&self) -> &'static str;
    fn model_type(&self) -> TypeId;
    fn relations(&self) -> Vec<Relation>;

    async fn find_for_request(
        &self,
        ctx: &RequestContext,
        param: &RouteParamDescriptor,
        value: &str,
    ) -> Option<BindResult<BoundInstance>>;

    async fn find_related_for_request(
        &self,
        parent: &BoundInstance,
        ctx: &RequestContext,
        param: &RouteParamDescriptor,
        value: &str,
    ) -> Option<BindResult<BoundInstance>>;

    fn decode(&self, record: Record) -> BindResult<BoundInstance>;
}

struct Erased<T>(PhantomData<fn() -> T>);

#[async_trait]
impl<T: BindableModel> ErasedModel for Erased<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn table(&self) -> &'static str {
        T::TABLE
    }

    fn route_key(&self) -> &'static str {
        T::route_key()
    }

    fn model_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn relations(&self) -> Vec<Relation> {
        T::relations()
    }

    async fn find_for_request(
        &self,
        ctx: &RequestContext,
        param: &RouteParamDescriptor,
        value: &str,
    ) -> Option<BindResult<BoundInstance>> {
        let result = T::find_for_request(ctx, param, value).await?;
        Some(result.and_then(BoundInstance::from_model))
    }

    async fn find_related_for_request(
        &self,
        parent: &BoundInstance,
        ctx: &RequestContext,
        param: &RouteParamDescriptor,
        value: &str,
    ) -> Option<BindResult<BoundInstance>> {
        let parent = parent.downcast::<T>()?;
        parent.find_related_for_request(ctx, param, value).await
    }

    fn decode(&self, record: Record) -> BindResult<BoundInstance> {
        let instance: T = decode_record(T::NAME, &record)?;
        Ok(BoundInstance::with_record(instance, record))
    }
}

pub(crate) fn decode_record<T: DeserializeOwned>(model: &str, record: &Record) -> BindResult<T> {
    let instance = serde_json::from_value(Value::Object(record.clone()))
        .with_context(|| format!("Failed to decode {} row", model))?;
    Ok(instance)
}

/// Type-erased handle to a [`BindableModel`] implementation.
#[derive(Clone)]
pub struct ModelRef(Arc<dyn ErasedModel>);

impl ModelRef {
    pub fn of<T: BindableModel>() -> Self {
        ModelRef(Arc::new(Erased::<T>(PhantomData)))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn table(&self) -> &'static str {
        self.0.table()
    }

    pub fn route_key(&self) -> &'static str {
        self.0.route_key()
    }

    pub fn relations(&self) -> Vec<Relation> {
        self.0.relations()
    }

    pub fn is<T: BindableModel>(&self) -> bool {
        self.0.model_type() == TypeId::of::<T>()
    }

    pub(crate) async fn find_for_request(
        &self,
        ctx: &RequestContext,
        param: &RouteParamDescriptor,
        value: &str,
    ) -> Option<BindResult<BoundInstance>> {
        self.0.find_for_request(ctx, param, value).await
    }

    pub(crate) async fn find_related_for_request(
        &self,
        parent: &BoundInstance,
        ctx: &RequestContext,
        param: &RouteParamDescriptor,
        value: &str,
    ) -> Option<BindResult<BoundInstance>> {
        self.0.find_related_for_request(parent, ctx, param, value).await
    }

    pub(crate) fn decode(&self, record: Record) -> BindResult<BoundInstance> {
        self.0.decode(record)
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.model_type() == other.0.model_type()
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.name()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    HasOne,
    HasMany,
    BelongsTo,
}

/// A relationship declared by a model, used for scoped lookups.
///
/// Related rows are the rows of `target` whose `target_column` equals the
/// parent's `parent_column`.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: &'static str,
    pub kind: RelationKind,
    pub target: ModelRef,
    pub target_column: &'static str,
    pub parent_column: &'static str,
}

impl Relation {
    pub fn has_many<T: BindableModel>(name: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            kind: RelationKind::HasMany,
            target: ModelRef::of::<T>(),
            target_column: foreign_key,
            parent_column: "id",
        }
    }

    pub fn has_one<T: BindableModel>(name: &'static str, foreign_key: &'static str) -> Self {
        Self {
            kind: RelationKind::HasOne,
            ..Self::has_many::<T>(name, foreign_key)
        }
    }

    pub fn belongs_to<T: BindableModel>(name: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            kind: RelationKind::BelongsTo,
            target: ModelRef::of::<T>(),
            target_column: "id",
            parent_column: foreign_key,
        }
    }

    /// Parent column of a has-one/has-many relation (defaults to `id`)
    pub fn local_key(mut self, column: &'static str) -> Self {
        self.parent_column = column;
        self
    }

    /// Target column of a belongs-to relation (defaults to `id`)
    pub fn owner_key(mut self, column: &'static str) -> Self {
        self.target_column = column;
        self
    }
}

/// A resolved model instance together with the row it was read from.
#[derive(Clone)]
pub struct BoundInstance {
    model: ModelRef,
    instance: Arc<dyn Any + Send + Sync>,
    record: Arc<Record>,
}

impl BoundInstance {
    /// Wrap an instance produced by a custom finder
    pub fn from_model<T: BindableModel>(instance: T) -> BindResult<Self> {
        let record = match serde_json::to_value(&instance)
            .with_context(|| format!("Failed to encode {}", T::NAME))?
        {
            Value::Object(record) => record,
            other => {
                return Err(anyhow!("{} must serialize to an object, got {}", T::NAME, other).into())
            }
        };
        Ok(Self::with_record(instance, record))
    }

    fn with_record<T: BindableModel>(instance: T, record: Record) -> Self {
        Self {
            model: ModelRef::of::<T>(),
            instance: Arc::new(instance),
            record: Arc::new(record),
        }
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub fn downcast<T: BindableModel>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn column(&self, column: &str) -> Option<&Value> {
        self.record.get(column)
    }
}

impl fmt::Debug for BoundInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundInstance")
            .field("model", &self.model.name())
            .field("record", &self.record)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comment, Post};
    use serde_json::json;

    #[test]
    fn test_model_ref_identity() {
        let post = ModelRef::of::<Post>();
        assert!(post.is::<Post>());
        assert!(!post.is::<Comment>());
        assert_eq!(post, ModelRef::of::<Post>());
        assert_ne!(post, ModelRef::of::<Comment>());
        assert_eq!(post.table(), "posts");
        assert_eq!(format!("{:?}", post), "ModelRef(\"Post\")");
    }

    #[test]
    fn test_decode_keeps_extra_columns() {
        let record = json!({
            "id": 2,
            "post_id": 1,
            "code": "c-2",
            "body": "Nice",
            "moderated_by": "ops"
        })
        .as_object()
        .cloned()
        .unwrap();

        let bound = ModelRef::of::<Comment>().decode(record).unwrap();
        let comment = bound.downcast::<Comment>().unwrap();
        assert_eq!(comment.code, "c-2");
        assert_eq!(bound.column("moderated_by"), Some(&json!("ops")));
        assert!(bound.downcast::<Post>().is_none());
    }

    #[test]
    fn test_decode_failure_is_store_error() {
        let record = json!({"id": "not-a-number"}).as_object().cloned().unwrap();
        let err = ModelRef::of::<Comment>().decode(record).unwrap_err();
        assert!(err.is_store());
    }

    #[test]
    fn test_from_model_serializes_record() {
        let comment = Comment {
            id: 9,
            post_id: 3,
            code: "c-9".to_string(),
            body: "Hello".to_string(),
        };
        let bound = BoundInstance::from_model(comment).unwrap();
        assert_eq!(bound.model_name(), "Comment");
        assert_eq!(bound.column("post_id"), Some(&json!(3)));
    }

    #[test]
    fn test_relation_constructors() {
        let comments = Relation::has_many::<Comment>("comments", "post_id");
        assert_eq!(comments.kind, RelationKind::HasMany);
        assert_eq!(comments.target_column, "post_id");
        assert_eq!(comments.parent_column, "id");

        let post = Relation::belongs_to::<Post>("post", "post_id").owner_key("id");
        assert_eq!(post.kind, RelationKind::BelongsTo);
        assert_eq!(post.target_column, "id");
        assert_eq!(post.parent_column, "post_id");

        let pinned = Relation::has_one::<Comment>("pinnedComment", "pinned_on").local_key("slug");
        assert_eq!(pinned.kind, RelationKind::HasOne);
        assert_eq!(pinned.parent_column, "slug");
    }
}
