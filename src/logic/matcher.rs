use crate::error::{BindResult, BindingError};
use crate::logic::registry::HandlerId;
use crate::model::{BindingSlot, ModelRef, ParsedRoute, RouteParamDescriptor, SlotKind};

/// A route parameter paired with the slot it feeds, before any lookup.
#[derive(Debug, Clone)]
pub enum PendingBinding {
    Raw {
        param: RouteParamDescriptor,
        slot: BindingSlot,
        value: String,
    },
    Model {
        param: RouteParamDescriptor,
        slot: BindingSlot,
        value: String,
        model: ModelRef,
        /// Index of the binding this one is scoped to
        parent: Option<usize>,
    },
}

impl PendingBinding {
    pub fn param(&self) -> &RouteParamDescriptor {
        match self {
            PendingBinding::Raw { param, .. } | PendingBinding::Model { param, .. } => param,
        }
    }

    pub fn slot(&self) -> &BindingSlot {
        match self {
            PendingBinding::Raw { slot, .. } | PendingBinding::Model { slot, .. } => slot,
        }
    }
}

/// Position of the model slot a scoped slot at `index` hangs off: the
/// nearest preceding slot that produces a model. Raw slots are skipped.
pub fn scope_parent(slots: &[BindingSlot], index: usize) -> Option<usize> {
    slots.get(..index)?.iter().rposition(BindingSlot::is_model)
}

/// Point each scoped parameter's `parent_name` at the parameter feeding its
/// scope parent slot.
///
/// The parser can only guess the previous token; once the handler's slots are
/// known the parent is the nearest preceding model slot.
pub fn align_scope_parents(route: &mut ParsedRoute, slots: &[BindingSlot]) {
    let parents: Vec<Option<String>> = (0..route.params.len())
        .map(|index| {
            scope_parent(slots, index)
                .and_then(|parent| route.params.get(parent))
                .map(|parent| parent.name.clone())
        })
        .collect();

    for (param, parent) in route.params.iter_mut().zip(parents) {
        if param.scoped {
            param.parent_name = parent;
        }
    }
}

/// Check that a handler's slots line up with a route's parameters.
///
/// This needs no request, so it runs both at boot and on every request.
pub fn check_alignment(
    route: &ParsedRoute,
    handler: &HandlerId,
    slots: &[BindingSlot],
) -> BindResult<()> {
    if slots.len() != route.params.len() {
        return Err(BindingError::ParamCountMismatch {
            route: route.pattern.clone(),
            handler: handler.to_string(),
            params: route.params.len(),
            slots: slots.len(),
        });
    }

    for (index, param) in route.params.iter().enumerate() {
        if !param.scoped {
            continue;
        }
        // Both ends of the relationship have to be model instances
        if scope_parent(slots, index).is_none() || !slots[index].is_model() {
            return Err(BindingError::InvalidScope {
                param: param.original_literal.clone(),
            });
        }
    }

    Ok(())
}

/// Zip route parameters, their request values and the handler slots by position.
pub fn match_params(
    route: &ParsedRoute,
    handler: &HandlerId,
    slots: &[BindingSlot],
    values: Vec<String>,
) -> BindResult<Vec<PendingBinding>> {
    check_alignment(route, handler, slots)?;

    if values.len() != route.params.len() {
        return Err(BindingError::ParamCountMismatch {
            route: route.pattern.clone(),
            handler: handler.to_string(),
            params: values.len(),
            slots: slots.len(),
        });
    }

    let mut aligned = route.clone();
    align_scope_parents(&mut aligned, slots);

    let pending = aligned
        .params
        .into_iter()
        .zip(slots)
        .zip(values)
        .enumerate()
        .map(|(index, ((param, slot), value))| match &slot.kind {
            SlotKind::Raw => PendingBinding::Raw {
                param,
                slot: slot.clone(),
                value,
            },
            SlotKind::Model(model) => PendingBinding::Model {
                parent: if param.scoped {
                    scope_parent(slots, index)
                } else {
                    None
                },
                param,
                slot: slot.clone(),
                value,
                model: model.clone(),
            },
        })
        .collect();

    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::route_params::parse_route;
    use crate::model::{Comment, Post, Slots};

    fn values(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn test_match_models_in_order() {
        let route = parse_route("/posts/:post/comments/:comment").unwrap();
        let slots = Slots::new().model::<Post>().model::<Comment>().build();

        let pending =
            match_params(&route, &"comments.show".into(), &slots, values(&["1", "2"])).unwrap();
        assert_eq!(pending.len(), 2);
        match &pending[1] {
            PendingBinding::Model { param, value, model, parent, .. } => {
                assert_eq!(param.name, "comment");
                assert_eq!(value, "2");
                assert!(model.is::<Comment>());
                assert_eq!(*parent, None);
            }
            other => panic!("expected model binding, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_slots_pass_values_through() {
        let route = parse_route("/api/:version/posts/:post").unwrap();
        let slots = Slots::new().raw().model::<Post>().build();

        let pending =
            match_params(&route, &"versioned".into(), &slots, values(&["v2", "1"])).unwrap();
        match &pending[0] {
            PendingBinding::Raw { value, param, .. } => {
                assert_eq!(value, "v2");
                assert_eq!(param.name, "version");
            }
            other => panic!("expected raw binding, got {:?}", other),
        }
        assert!(matches!(pending[1], PendingBinding::Model { .. }));
    }

    #[test]
    fn test_scoped_binding_points_at_parent() {
        let route = parse_route("/posts/:post/comments/:>comment").unwrap();
        let slots = Slots::new().model::<Post>().model::<Comment>().build();

        let pending =
            match_params(&route, &"comments.show".into(), &slots, values(&["1", "2"])).unwrap();
        assert!(matches!(pending[1], PendingBinding::Model { parent: Some(0), .. }));
        assert_eq!(pending[1].param().parent_name.as_deref(), Some("post"));
    }

    #[test]
    fn test_slot_count_mismatch() {
        let route = parse_route("/a/:a/b/:b/c/:c").unwrap();
        let slots = Slots::new().model::<Post>().model::<Comment>().build();

        let err = check_alignment(&route, &"short".into(), &slots).unwrap_err();
        assert!(matches!(
            err,
            BindingError::ParamCountMismatch { params: 3, slots: 2, .. }
        ));
    }

    #[test]
    fn test_scope_onto_raw_slot_is_rejected() {
        let route = parse_route("/api/:version/posts/:>post").unwrap();
        let slots = Slots::new().raw().model::<Post>().build();

        let err = check_alignment(&route, &"versioned".into(), &slots).unwrap_err();
        assert!(matches!(err, BindingError::InvalidScope { .. }));
    }

    #[test]
    fn test_raw_scoped_slot_is_rejected() {
        let route = parse_route("/posts/:post/tags/:>tag").unwrap();
        let slots = Slots::new().model::<Post>().raw().build();

        let err = check_alignment(&route, &"tags".into(), &slots).unwrap_err();
        assert!(matches!(err, BindingError::InvalidScope { .. }));
    }

    #[test]
    fn test_scope_skips_raw_slots_to_reach_model_parent() {
        let route = parse_route("/posts/:post/v/:version/comments/:>comment").unwrap();
        assert_eq!(route.params[2].parent_name.as_deref(), Some("version"));
        let slots = Slots::new().model::<Post>().raw().model::<Comment>().build();

        check_alignment(&route, &"comments.versioned".into(), &slots).unwrap();
        let pending = match_params(
            &route,
            &"comments.versioned".into(),
            &slots,
            values(&["1", "v2", "2"]),
        )
        .unwrap();
        assert!(matches!(pending[2], PendingBinding::Model { parent: Some(0), .. }));
        assert_eq!(pending[2].param().parent_name.as_deref(), Some("post"));
        assert_eq!(pending[2].slot().position, 2);
    }

    #[test]
    fn test_align_scope_parents_rewrites_descriptors() {
        let mut route = parse_route("/posts/:post/v/:version/comments/:>comment").unwrap();
        let slots = Slots::new().model::<Post>().raw().model::<Comment>().build();

        align_scope_parents(&mut route, &slots);
        assert_eq!(route.params[1].parent_name, None);
        assert_eq!(route.params[2].parent_name.as_deref(), Some("post"));
    }

    #[test]
    fn test_scope_parent_positions() {
        let slots = Slots::new().model::<Post>().raw().raw().model::<Comment>().build();
        assert_eq!(scope_parent(&slots, 0), None);
        assert_eq!(scope_parent(&slots, 2), Some(0));
        assert_eq!(scope_parent(&slots, 3), Some(0));
        assert_eq!(scope_parent(&slots, 9), None);
    }
}
