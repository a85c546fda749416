use std::fmt;

use crate::model::bindable::{BindableModel, ModelRef};

/// What a handler argument expects to receive.
#[derive(Clone, PartialEq)]
pub enum SlotKind {
    /// The route value is passed through untouched
    Raw,
    /// The route value is resolved into an instance of this model
    Model(ModelRef),
}

impl SlotKind {
    pub fn model<T: BindableModel>() -> Self {
        SlotKind::Model(ModelRef::of::<T>())
    }

    pub fn model_ref(&self) -> Option<&ModelRef> {
        match self {
            SlotKind::Raw => None,
            SlotKind::Model(model) => Some(model),
        }
    }
}

impl fmt::Debug for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Raw => f.write_str("Raw"),
            SlotKind::Model(model) => write!(f, "Model({})", model.name()),
        }
    }
}

/// A handler argument after the request context, by position.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingSlot {
    pub position: usize,
    pub kind: SlotKind,
}

impl BindingSlot {
    pub fn new(position: usize, kind: SlotKind) -> Self {
        Self { position, kind }
    }

    pub fn is_model(&self) -> bool {
        matches!(self.kind, SlotKind::Model(_))
    }
}

/// Builds a handler's slot list in declaration order.
///
/// ```
/// use route_binding::model::{Comment, Post, Slots};
///
/// let slots = Slots::new().model::<Post>().model::<Comment>().build();
/// assert_eq!(slots.len(), 2);
/// assert_eq!(slots[1].position, 1);
/// ```
#[derive(Debug, Default)]
pub struct Slots {
    slots: Vec<BindingSlot>,
}

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(self) -> Self {
        self.push(SlotKind::Raw)
    }

    pub fn model<T: BindableModel>(self) -> Self {
        self.push(SlotKind::model::<T>())
    }

    fn push(mut self, kind: SlotKind) -> Self {
        let position = self.slots.len();
        self.slots.push(BindingSlot::new(position, kind));
        self
    }

    pub fn build(self) -> Vec<BindingSlot> {
        self.slots
    }
}

impl IntoIterator for Slots {
    type Item = BindingSlot;
    type IntoIter = std::vec::IntoIter<BindingSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.into_iter()
    }
}
