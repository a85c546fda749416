use axum::{
    extract::{RawPathParams, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
    Router,
};
use std::sync::Arc;

use crate::error::{BindResult, BindingError};
use crate::logic::{align_scope_parents, check_alignment, parse_route, BindingEngine, HandlerId};
use crate::model::{ParsedRoute, RequestContext};

/// Per-route state for the binding middleware.
#[derive(Clone)]
struct RouteBinding {
    engine: Arc<BindingEngine>,
    handler: HandlerId,
    route: Arc<ParsedRoute>,
}

/// Resolve the route's bound parameters before the handler runs.
///
/// On success the resolved [`BoundArgs`](crate::logic::BoundArgs) are stored in
/// the request extensions for the [`Bound`](crate::api::Bound) extractor. Any
/// failure short-circuits the request and the handler is never called.
async fn bind_route(
    State(binding): State<RouteBinding>,
    params: RawPathParams,
    mut request: Request,
    next: Next,
) -> Result<Response, BindingError> {
    // The router captures parameters in path order, which is slot order
    let values = params.iter().map(|(_, value)| value.to_string()).collect();

    let context = RequestContext::new(
        request.method().clone(),
        request.uri().clone(),
        request.headers().clone(),
        &binding.route.pattern,
        binding.engine.store(),
    );

    if let Some(args) = binding
        .engine
        .bind(&binding.handler, &binding.route, values, context)
        .await?
    {
        request.extensions_mut().insert(args);
    }

    Ok(next.run(request).await)
}

/// Builds an axum router from patterns written in binding syntax
/// (`:name`, `:name(key)`, `:>name`, `:>name(key)`).
pub struct BindingRouter<S = ()> {
    engine: Arc<BindingEngine>,
    router: Router<S>,
    routes: Vec<(HandlerId, Arc<ParsedRoute>)>,
}

impl<S> BindingRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(engine: Arc<BindingEngine>) -> Self {
        Self {
            engine,
            router: Router::new(),
            routes: Vec::new(),
        }
    }

    /// Add a route whose parameters are bound for `handler`.
    ///
    /// The pattern is parsed here, so malformed parameters fail at startup.
    pub fn route(
        mut self,
        pattern: &str,
        handler: impl Into<HandlerId>,
        method_router: MethodRouter<S>,
    ) -> BindResult<Self> {
        if !pattern.starts_with('/') {
            return Err(BindingError::MalformedParam {
                token: pattern.to_string(),
                reason: "route patterns start with '/'".to_string(),
            });
        }

        let handler = handler.into();
        let mut route = parse_route(pattern)?;
        if let Some(slots) = self.engine.registry().lookup(&handler) {
            align_scope_parents(&mut route, &slots);
        }
        let route = Arc::new(route);
        let binding = RouteBinding {
            engine: self.engine.clone(),
            handler: handler.clone(),
            route: route.clone(),
        };

        log::info!("Route {} -> {}", pattern, handler);
        self.router = self.router.route(
            &route.router_path,
            method_router.route_layer(middleware::from_fn_with_state(binding, bind_route)),
        );
        self.routes.push((handler, route));
        Ok(self)
    }

    /// Add routes that take no part in binding
    pub fn merge(mut self, router: Router<S>) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Check every bound route against its handler's slots.
    ///
    /// The same checks run on each request; this surfaces them at boot.
    pub fn verify(&self) -> BindResult<()> {
        for (handler, route) in &self.routes {
            match self.engine.registry().lookup(handler) {
                Some(slots) => check_alignment(route, handler, &slots)?,
                None => log::warn!(
                    "Route {} names handler {} which has no binding metadata",
                    route.pattern,
                    handler
                ),
            }
        }
        Ok(())
    }

    pub fn routes(&self) -> impl Iterator<Item = (&HandlerId, &ParsedRoute)> {
        self.routes
            .iter()
            .map(|(handler, route)| (handler, route.as_ref()))
    }

    pub fn into_router(self) -> Router<S> {
        self.router
    }
}
