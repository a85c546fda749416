use axum::response::Json;
use serde::Serialize;

use crate::api::Bound;
use crate::error::BindResult;
use crate::model::{Author, Comment, Post, RouteParamDescriptor};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub handler: String,
    pub pattern: String,
    pub router_path: String,
    pub params: Vec<RouteParamDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub post: Post,
    pub comment: Comment,
}

#[derive(Debug, Serialize)]
pub struct VersionedPostResponse {
    pub version: String,
    pub post: Post,
}

#[derive(Debug, Serialize)]
pub struct AuthorPostResponse {
    pub author: Author,
    pub post: Post,
}

pub async fn show_author(Bound(args): Bound) -> BindResult<Json<Author>> {
    let author = args.model::<Author>(0)?;
    Ok(Json(Author::clone(&author)))
}

pub async fn show_post(Bound(args): Bound) -> BindResult<Json<Post>> {
    let post = args.model::<Post>(0)?;
    Ok(Json(Post::clone(&post)))
}

pub async fn show_comment(Bound(args): Bound) -> BindResult<Json<CommentResponse>> {
    let post = args.model::<Post>(0)?;
    let comment = args.model::<Comment>(1)?;
    Ok(Json(CommentResponse {
        post: Post::clone(&post),
        comment: Comment::clone(&comment),
    }))
}

pub async fn show_versioned_post(Bound(args): Bound) -> BindResult<Json<VersionedPostResponse>> {
    let version = args.raw(0)?.to_string();
    let post = args.model::<Post>(1)?;
    Ok(Json(VersionedPostResponse {
        version,
        post: Post::clone(&post),
    }))
}

pub async fn show_author_post(Bound(args): Bound) -> BindResult<Json<AuthorPostResponse>> {
    let author = args.model::<Author>(0)?;
    let post = args.model::<Post>(1)?;
    Ok(Json(AuthorPostResponse {
        author: Author::clone(&author),
        post: Post::clone(&post),
    }))
}
