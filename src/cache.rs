//! Element cache keyed by DOM id
//!
//! Widgets look elements up by id far more often than they create them, so
//! the cache hands out ids to anonymous elements and keeps the handle. A
//! sweep with [`ElementCache::collect`] forgets elements that have left the
//! document.

use std::collections::HashMap;

/// Default prefix of generated ids
pub const DEFAULT_ID_PREFIX: &str = "ext-gen";

/// An element the cache can identify and sweep
pub trait CachedElement: Clone {
    /// Current id, empty if none
    fn dom_id(&self) -> String;

    fn set_dom_id(&self, id: &str);

    /// Still part of a live document
    fn is_attached(&self) -> bool;
}

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
impl CachedElement for web_sys::Element {
    fn dom_id(&self) -> String {
        self.id()
    }

    fn set_dom_id(&self, id: &str) {
        self.set_id(id);
    }

    fn is_attached(&self) -> bool {
        self.is_connected()
    }
}

pub struct ElementCache<E: CachedElement> {
    prefix: String,
    next_id: u64,
    entries: HashMap<String, E>,
}

impl<E: CachedElement> ElementCache<E> {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_ID_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next_id: 1,
            entries: HashMap::new(),
        }
    }

    /// The element's id, assigning a generated one if it has none
    pub fn id_of(&mut self, element: &E) -> String {
        let id = element.dom_id();
        if !id.is_empty() {
            return id;
        }
        let id = format!("{}{}", self.prefix, self.next_id);
        self.next_id += 1;
        element.set_dom_id(&id);
        id
    }

    /// Cache `element` under its id. Returns the id.
    pub fn insert(&mut self, element: E) -> String {
        let id = self.id_of(&element);
        self.entries.insert(id.clone(), element);
        id
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.entries.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<E> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop detached elements. Returns how many were removed.
    pub fn collect(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, element| element.is_attached());
        let removed = before - self.entries.len();
        if removed > 0 {
            crate::console_log!("[cache] collected {} detached element(s)", removed);
        }
        removed
    }
}

impl<E: CachedElement> Default for ElementCache<E> {
    fn default() -> Self {
        Self::new()
    }
}
