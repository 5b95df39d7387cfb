use std::collections::HashMap;

use super::{AudioId, ImageId, ResourceResolver};

/// Process-wide source → image-handle cache.
///
/// Lifecycle is tied to the engine instance, not any single object; every
/// object referencing the same source shares one handle (and therefore one
/// atlas entry).
#[derive(Debug, Default)]
pub struct ImageCache {
    by_source: HashMap<String, ImageId>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached handle for `source`, registering it with the
    /// resolver on first sight.
    pub fn resolve(&mut self, resolver: &mut dyn ResourceResolver, source: &str) -> ImageId {
        if let Some(&id) = self.by_source.get(source) {
            return id;
        }
        let id = resolver.request_image(source);
        self.by_source.insert(source.to_owned(), id);
        id
    }

    pub fn get(&self, source: &str) -> Option<ImageId> {
        self.by_source.get(source).copied()
    }
}

/// Process-wide source → audio-handle cache.
#[derive(Debug, Default)]
pub struct AudioCache {
    by_source: HashMap<String, AudioId>,
}

impl AudioCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, resolver: &mut dyn ResourceResolver, source: &str) -> AudioId {
        if let Some(&id) = self.by_source.get(source) {
            return id;
        }
        let id = resolver.request_audio(source);
        self.by_source.insert(source.to_owned(), id);
        id
    }

    pub fn get(&self, source: &str) -> Option<AudioId> {
        self.by_source.get(source).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::StaticResolver;

    #[test]
    fn resolve_deduplicates_by_source() {
        let mut resolver = StaticResolver::new();
        resolver.insert_image("a.png", 1, 1, vec![0; 4]);

        let mut cache = ImageCache::new();
        let a = cache.resolve(&mut resolver, "a.png");
        let b = cache.resolve(&mut resolver, "a.png");
        assert_eq!(a, b);
        assert_eq!(cache.get("a.png"), Some(a));
    }
}
