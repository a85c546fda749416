use crate::error::{BindResult, BindingError};
use crate::logic::inflect::{camel_case, relation_candidates};
use crate::model::{BoundInstance, ModelRef, Relation, RequestContext, RouteParamDescriptor};
use crate::store::{value_text, LookupQuery, ModelStore, Record};

/// Which strategy produced an instance. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    ModelOverride,
    RelationOverride,
    DefaultKey,
    ScopedDefaultKey,
}

/// Run a lookup and keep the first row.
///
/// Keys are expected to be unique. When they are not, the first row in
/// storage order wins; the ambiguity is logged and never turned into an error.
pub async fn fetch_first(
    store: &dyn ModelStore,
    query: LookupQuery,
    model: &str,
) -> BindResult<Record> {
    let query = query.limit(2);
    let mut rows = store.find(&query).await?;

    if rows.len() > 1 {
        log::warn!(
            "{} lookup on {}.{} = {:?} matched more than one row; using the first",
            model,
            query.table,
            query.column,
            query.value
        );
    }

    if rows.is_empty() {
        return Err(BindingError::not_found(model, &query.column, &query.value));
    }
    Ok(rows.swap_remove(0))
}

/// Resolve one model-bound route value into an instance.
///
/// Strategies are tried in priority order: the model's own finder, then the
/// parent's related finder for scoped parameters, then a key lookup, itself
/// scoped through a relationship when the parameter is scoped.
pub async fn resolve_model(
    model: &ModelRef,
    param: &RouteParamDescriptor,
    value: &str,
    ctx: &RequestContext,
    parent: Option<&BoundInstance>,
    position: usize,
) -> BindResult<BoundInstance> {
    let (strategy, result) = lookup(model, param, value, ctx, parent).await;
    let instance = result?;

    if instance.model() != model {
        return Err(BindingError::TypeMismatch {
            position,
            expected: model.name().to_string(),
            found: instance.model_name().to_string(),
        });
    }

    log::debug!(
        "Bound {} = {:?} to {} via {:?}",
        param.original_literal,
        value,
        model.name(),
        strategy
    );
    Ok(instance)
}

async fn lookup(
    model: &ModelRef,
    param: &RouteParamDescriptor,
    value: &str,
    ctx: &RequestContext,
    parent: Option<&BoundInstance>,
) -> (LookupStrategy, BindResult<BoundInstance>) {
    if let Some(result) = model.find_for_request(ctx, param, value).await {
        return (LookupStrategy::ModelOverride, result);
    }

    if !param.scoped {
        return (
            LookupStrategy::DefaultKey,
            default_lookup(model, param, value, ctx).await,
        );
    }

    let Some(parent) = parent else {
        return (
            LookupStrategy::ScopedDefaultKey,
            Err(BindingError::InvalidScope {
                param: param.original_literal.clone(),
            }),
        );
    };

    if let Some(result) = parent
        .model()
        .find_related_for_request(parent, ctx, param, value)
        .await
    {
        return (LookupStrategy::RelationOverride, result);
    }

    (
        LookupStrategy::ScopedDefaultKey,
        scoped_lookup(param, value, ctx, parent).await,
    )
}

async fn default_lookup(
    model: &ModelRef,
    param: &RouteParamDescriptor,
    value: &str,
    ctx: &RequestContext,
) -> BindResult<BoundInstance> {
    let key = param.lookup_key.resolve(model.route_key());
    let query = LookupQuery::by_key(model.table(), key, value);
    let record = fetch_first(ctx.store(), query, model.name()).await?;
    model.decode(record)
}

async fn scoped_lookup(
    param: &RouteParamDescriptor,
    value: &str,
    ctx: &RequestContext,
    parent: &BoundInstance,
) -> BindResult<BoundInstance> {
    let relation = find_relation(parent.model(), param)?;

    let parent_value = match parent.column(relation.parent_column) {
        None => {
            return Err(BindingError::MissingColumn {
                model: parent.model_name().to_string(),
                column: relation.parent_column.to_string(),
            })
        }
        Some(column) => value_text(column),
    };
    // A NULL parent key relates to nothing
    let Some(parent_value) = parent_value else {
        return Err(BindingError::not_found(
            relation.target.name(),
            relation.target_column,
            value,
        ));
    };

    let target = &relation.target;
    let key = param.lookup_key.resolve(target.route_key());
    let query = LookupQuery::by_key(target.table(), key, value)
        .scoped_to(relation.target_column, &parent_value);
    let record = fetch_first(ctx.store(), query, target.name()).await?;
    target.decode(record)
}

/// Find the relationship on `parent` named after a scoped parameter, in
/// either its singular or plural form.
pub fn find_relation(parent: &ModelRef, param: &RouteParamDescriptor) -> BindResult<Relation> {
    let candidates = relation_candidates(&param.name);
    let relations = parent.relations();

    candidates
        .iter()
        .find_map(|candidate| {
            relations
                .iter()
                .find(|relation| camel_case(relation.name) == *candidate)
                .cloned()
        })
        .ok_or_else(|| BindingError::MissingRelationship {
            parent: parent.name().to_string(),
            param: param.original_literal.clone(),
            candidates,
        })
}
