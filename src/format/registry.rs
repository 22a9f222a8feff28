//! Format registry for looking up codecs by id.

use std::collections::BTreeMap;

use crate::format::formats::{NativeJsonFormat, YoloFormat};
use crate::format::traits::AnnotationFormat;

/// Registry of available interchange formats.
pub struct FormatRegistry {
    formats: BTreeMap<&'static str, Box<dyn AnnotationFormat>>,
}

impl FormatRegistry {
    /// Create a new registry with all built-in formats registered.
    pub fn new() -> Self {
        let mut registry = Self {
            formats: BTreeMap::new(),
        };
        registry.register(Box::new(NativeJsonFormat));
        registry.register(Box::new(YoloFormat));
        registry
    }

    /// Register a format implementation, replacing one with the same id.
    pub fn register(&mut self, format: Box<dyn AnnotationFormat>) {
        self.formats.insert(format.id(), format);
    }

    /// Get a format by its ID.
    pub fn get(&self, id: &str) -> Option<&dyn AnnotationFormat> {
        self.formats.get(id).map(|f| f.as_ref())
    }

    /// Get all registered formats, ordered by id.
    pub fn all(&self) -> Vec<&dyn AnnotationFormat> {
        self.formats.values().map(|f| f.as_ref()).collect()
    }

    /// Get all format IDs.
    pub fn ids(&self) -> Vec<&'static str> {
        self.formats.keys().copied().collect()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
