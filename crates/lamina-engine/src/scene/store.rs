use std::collections::HashMap;

use super::{AttrMap, Object, ObjectId, SetHook};

/// Owner of every live object, keyed by identity.
///
/// Layer membership is tracked on the layers themselves (ordered id lists);
/// the store only answers identity lookups. Removing an object here drops
/// its attributes and snapshot together.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: HashMap<ObjectId, Object>,
    next_id: u64,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attrs: AttrMap, set_hook: Option<SetHook>) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, Object::new(id, attrs, set_hook));
        id
    }

    #[inline]
    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        self.objects.remove(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AttrKey, AttrValue};

    #[test]
    fn insert_assigns_unique_ids() {
        let mut store = ObjectStore::new();
        let a = store.insert(AttrMap::new(), None);
        let b = store.insert(AttrMap::new(), None);
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn remove_drops_object_and_snapshot() {
        let mut store = ObjectStore::new();
        let mut attrs = AttrMap::new();
        attrs.insert(AttrKey::X, AttrValue::Float(5.0));

        let id = store.insert(attrs, None);
        store.get_mut(id).unwrap().snapshot.insert(AttrKey::X, AttrValue::Float(5.0));

        assert!(store.remove(id).is_some());
        assert!(!store.contains(id));
        assert!(store.remove(id).is_none());
    }
}
