use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BindResult, BindingError};
use crate::logic::inflect::relation_candidates;
use crate::model::{BindableModel, BoundInstance, Relation, RequestContext, RouteParamDescriptor};
use crate::store::LookupQuery;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub created_at: String, // ISO 8601 timestamp
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub code: String,
    pub body: String,
}

/// Usernames are stored lowercase, so author lookups ignore case.
/// Posts reached through an author only include published ones; other scoped
/// children fall back to the default relationship lookup.
#[async_trait]
impl BindableModel for Author {
    const NAME: &'static str = "Author";
    const TABLE: &'static str = "authors";

    fn relations() -> Vec<Relation> {
        vec![Relation::has_many::<Post>("posts", "author_id")]
    }

    async fn find_for_request(
        ctx: &RequestContext,
        param: &RouteParamDescriptor,
        value: &str,
    ) -> Option<BindResult<Self>> {
        let key = param.lookup_key.resolve(Self::route_key());
        let value = if key == "username" {
            value.to_lowercase()
        } else {
            value.to_string()
        };
        Some(ctx.find_by::<Author>(key, &value).await)
    }

    async fn find_related_for_request(
        &self,
        ctx: &RequestContext,
        param: &RouteParamDescriptor,
        value: &str,
    ) -> Option<BindResult<BoundInstance>> {
        if !relation_candidates(&param.name).iter().any(|name| name == "posts") {
            return None;
        }

        let key = param.lookup_key.resolve(Post::route_key());
        let query =
            LookupQuery::by_key(Post::TABLE, key, value).scoped_to("author_id", &self.id.to_string());

        let result = match ctx.find_with::<Post>(query).await {
            Ok(post) if post.published => BoundInstance::from_model(post),
            Ok(_) => Err(BindingError::not_found(Post::NAME, key, value)),
            Err(err) => Err(err),
        };
        Some(result)
    }
}

#[async_trait]
impl BindableModel for Post {
    const NAME: &'static str = "Post";
    const TABLE: &'static str = "posts";

    fn relations() -> Vec<Relation> {
        vec![
            Relation::has_many::<Comment>("comments", "post_id"),
            Relation::belongs_to::<Author>("author", "author_id"),
        ]
    }
}

#[async_trait]
impl BindableModel for Comment {
    const NAME: &'static str = "Comment";
    const TABLE: &'static str = "comments";

    fn relations() -> Vec<Relation> {
        vec![Relation::belongs_to::<Post>("post", "post_id")]
    }
}
