//! Renders the job list into selectable elements.
//!
//! Every load produces a new generation. A `TriggerHandle` records the
//! generation it was created in, so a handle kept from an earlier load can be
//! recognised as stale instead of acting on a job element that no longer exists.

use crate::api::TransportError;
use crate::model::JobDescriptor;

/// Activation handle bound to one rendered job element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerHandle {
    pub id: u32,
    pub generation: u64,
    pub slot: usize,
}

#[derive(Debug, Clone)]
pub struct JobElement {
    pub descriptor: JobDescriptor,
    pub trigger: TriggerHandle,
}

#[derive(Debug, Clone, Default)]
enum RegistryView {
    #[default]
    Loading,
    Loaded(Vec<JobElement>),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    view: RegistryView,
}

impl JobRegistry {
    /// Replace all elements with one per descriptor, in the order received.
    pub fn render(&mut self, descriptors: Vec<JobDescriptor>, generation: u64) {
        let elements = descriptors
            .into_iter()
            .enumerate()
            .map(|(slot, descriptor)| JobElement {
                trigger: TriggerHandle {
                    id: descriptor.id,
                    generation,
                    slot,
                },
                descriptor,
            })
            .collect();
        self.view = RegistryView::Loaded(elements);
    }

    /// Replace the whole area with a single error message.
    pub fn fail(&mut self, err: &TransportError) {
        self.view = RegistryView::Failed(format!("Error loading proofs: {err}"));
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.view, RegistryView::Loading)
    }

    pub fn elements(&self) -> &[JobElement] {
        match &self.view {
            RegistryView::Loaded(elements) => elements,
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.view {
            RegistryView::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn trigger_at(&self, slot: usize) -> Option<TriggerHandle> {
        self.elements().get(slot).map(|e| e.trigger)
    }

    pub fn trigger_for(&self, id: u32) -> Option<TriggerHandle> {
        self.elements()
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| e.trigger)
    }
}
