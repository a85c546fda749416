use axum::{response::Json, routing::get, Router};
use std::sync::Arc;

use crate::api::handlers::{self, RouteSummary};
use crate::api::BindingRouter;
use crate::error::BindResult;
use crate::logic::{BindingEngine, BindingRegistry};
use crate::model::{Author, Comment, Post, Slots};

/// Binding metadata for the blog handlers, in argument order
pub fn blog_registry() -> BindResult<BindingRegistry> {
    let registry = BindingRegistry::new();
    registry.register("authors.show", Slots::new().model::<Author>())?;
    registry.register("posts.show", Slots::new().model::<Post>())?;
    registry.register(
        "comments.show",
        Slots::new().model::<Post>().model::<Comment>(),
    )?;
    registry.register("posts.versioned", Slots::new().raw().model::<Post>())?;
    registry.register(
        "authors.posts.show",
        Slots::new().model::<Author>().model::<Post>(),
    )?;
    Ok(registry)
}

pub fn create_router(engine: Arc<BindingEngine>, verify: bool) -> BindResult<Router> {
    let router = BindingRouter::new(engine)
        // Authors are looked up by username through their own finder
        .route("/authors/:author(username)", "authors.show", get(handlers::show_author))?
        .route(
            "/authors/:author(username)/posts/:>post(slug)",
            "authors.posts.show",
            get(handlers::show_author_post),
        )?
        .route("/posts/:post", "posts.show", get(handlers::show_post))?
        .route("/posts/by-slug/:post(slug)", "posts.show", get(handlers::show_post))?
        // Comment must belong to the post
        .route(
            "/posts/:post/comments/:>comment",
            "comments.show",
            get(handlers::show_comment),
        )?
        // Comment is looked up on its own, whatever post it belongs to
        .route(
            "/lookup/posts/:post/comments/:comment",
            "comments.show",
            get(handlers::show_comment),
        )?
        .route(
            "/api/:version/posts/:post",
            "posts.versioned",
            get(handlers::show_versioned_post),
        )?;

    if verify {
        router.verify()?;
    }

    let summaries: Vec<RouteSummary> = router
        .routes()
        .map(|(handler, route)| RouteSummary {
            handler: handler.to_string(),
            pattern: route.pattern.clone(),
            router_path: route.router_path.clone(),
            params: route.params.clone(),
        })
        .collect();

    Ok(router
        .into_router()
        .route("/health", get(handlers::health_check))
        .route(
            "/routes",
            get(move || {
                let summaries = summaries.clone();
                async move { Json(summaries) }
            }),
        ))
}
