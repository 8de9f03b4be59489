#![forbid(unsafe_code)]

//! Cache of parsed template shapes.
//!
//! Shapes are keyed by the 64-bit fragment hash. A hit is only trusted when
//! the cached shape was built from the very same fragments; on a collision
//! the new shape is built without being cached.

use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::TemplateError;
use crate::shape::Shape;
use crate::template::Template;

/// Eviction policy for the shape cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Keep every shape. Templates are usually static per call site, so the
    /// number of distinct shapes is bounded by the program text.
    #[default]
    Unbounded,
    /// Keep at most this many shapes, evicting the least recently used.
    Lru(usize),
}

/// Statistics about cache performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Lookups whose hash matched a shape built from other fragments.
    pub collisions: u64,
    /// Current number of entries.
    pub size: usize,
    /// Maximum number of entries, `None` when unbounded.
    pub capacity: Option<usize>,
}

impl CacheStats {
    /// Hit rate (0.0 to 1.0).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
enum Store {
    Unbounded(FxHashMap<u64, Rc<Shape>>),
    Lru(LruCache<u64, Rc<Shape>>),
}

/// Shape cache owned by an [`Engine`](crate::Engine).
#[derive(Debug)]
pub struct TemplateCache {
    store: Store,
    hits: u64,
    misses: u64,
    collisions: u64,
}

impl TemplateCache {
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        let store = match policy {
            CachePolicy::Unbounded => Store::Unbounded(FxHashMap::default()),
            CachePolicy::Lru(capacity) => {
                let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
                Store::Lru(LruCache::new(capacity))
            }
        };
        Self {
            store,
            hits: 0,
            misses: 0,
            collisions: 0,
        }
    }

    fn lookup(&mut self, hash: u64) -> Option<Rc<Shape>> {
        match &mut self.store {
            Store::Unbounded(map) => map.get(&hash).cloned(),
            Store::Lru(lru) => lru.get(&hash).cloned(),
        }
    }

    fn insert(&mut self, shape: Rc<Shape>) {
        match &mut self.store {
            Store::Unbounded(map) => {
                map.insert(shape.hash, shape);
            }
            Store::Lru(lru) => {
                lru.put(shape.hash, shape);
            }
        }
    }

    /// The shape for `template`, built and cached on first use.
    pub(crate) fn shape_for(&mut self, template: &Template) -> Result<Rc<Shape>, TemplateError> {
        let hash = template.shape_hash();
        match self.lookup(hash) {
            Some(shape) if shape.matches(template) => {
                self.hits += 1;
                Ok(shape)
            }
            Some(_) => {
                self.collisions += 1;
                warn!(hash, "template shape hash collision; building uncached");
                Shape::build(template).map(Rc::new)
            }
            None => {
                self.misses += 1;
                let shape = Rc::new(Shape::build(template)?);
                debug!(
                    hash,
                    slots = shape.kinds.len(),
                    marked = shape.marker.is_some(),
                    "template shape compiled"
                );
                self.insert(Rc::clone(&shape));
                Ok(shape)
            }
        }
    }

    /// Whether a shape for these fragments is cached.
    #[must_use]
    pub fn contains(&self, template: &Template) -> bool {
        let hash = template.shape_hash();
        let shape = match &self.store {
            Store::Unbounded(map) => map.get(&hash),
            Store::Lru(lru) => lru.peek(&hash),
        };
        shape.is_some_and(|shape| shape.matches(template))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match &self.store {
            Store::Unbounded(map) => map.len(),
            Store::Lru(lru) => lru.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match &mut self.store {
            Store::Unbounded(map) => map.clear(),
            Store::Lru(lru) => lru.clear(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            collisions: self.collisions,
            size: self.len(),
            capacity: match &self.store {
                Store::Unbounded(_) => None,
                Store::Lru(lru) => Some(lru.cap().get()),
            },
        }
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn template(fragments: [&'static str; 2]) -> Template {
        Template::new(fragments, vec![Value::from("x")])
    }

    #[test]
    fn second_lookup_hits() {
        let mut cache = TemplateCache::default();
        let t = template(["<p>", "</p>"]);
        let a = cache.shape_for(&t).unwrap();
        let b = cache.shape_for(&t).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
        assert_eq!(stats.capacity, None);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn lru_evicts_oldest() {
        let mut cache = TemplateCache::new(CachePolicy::Lru(1));
        let first = template(["<p>", "</p>"]);
        let second = template(["<b>", "</b>"]);
        cache.shape_for(&first).unwrap();
        cache.shape_for(&second).unwrap();
        assert!(!cache.contains(&first));
        assert!(cache.contains(&second));
        assert_eq!(cache.stats().capacity, Some(1));
    }

    #[test]
    fn errors_are_not_cached() {
        let mut cache = TemplateCache::default();
        let broken = template(["<p ", "></p>"]);
        assert!(cache.shape_for(&broken).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
    }
}
