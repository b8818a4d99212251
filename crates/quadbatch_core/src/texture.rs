//! Texture registry
//!
//! Maps host-chosen integer IDs to backend texture handles. Streams refer to
//! textures through a [`TextureKey`]; once a texture is removed its key no
//! longer resolves, even if the same ID is registered again later.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Generational handle to a registered texture
    pub struct TextureKey;
}

/// Texture ID reserved for the debug overlay font
pub const FONT_TEXTURE_ID: i32 = -1;

/// A registered texture
#[derive(Debug)]
pub struct TextureEntry<T> {
    pub id: i32,
    pub handle: T,
    pub width: u32,
    pub height: u32,
}

/// ID -> texture map with generational keys
#[derive(Debug)]
pub struct TextureRegistry<T> {
    entries: SlotMap<TextureKey, TextureEntry<T>>,
    by_id: FxHashMap<i32, TextureKey>,
}

impl<T> Default for TextureRegistry<T> {
    fn default() -> Self {
        Self {
            entries: SlotMap::with_key(),
            by_id: FxHashMap::default(),
        }
    }
}

impl<T> TextureRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` under `id`, returning its key and any entry that
    /// previously held the ID.
    pub fn insert(
        &mut self,
        id: i32,
        handle: T,
        width: u32,
        height: u32,
    ) -> (TextureKey, Option<(TextureKey, TextureEntry<T>)>) {
        let previous = self.remove(id);
        let key = self.entries.insert(TextureEntry {
            id,
            handle,
            width,
            height,
        });
        self.by_id.insert(id, key);
        (key, previous)
    }

    pub fn remove(&mut self, id: i32) -> Option<(TextureKey, TextureEntry<T>)> {
        let key = self.by_id.remove(&id)?;
        let entry = self.entries.remove(key)?;
        Some((key, entry))
    }

    /// Resolve an ID to its key and entry.
    pub fn lookup(&self, id: i32) -> Option<(TextureKey, &TextureEntry<T>)> {
        let key = *self.by_id.get(&id)?;
        self.entries.get(key).map(|entry| (key, entry))
    }

    /// Resolve a key held by a stream. Stale keys return `None`.
    pub fn get(&self, key: TextureKey) -> Option<&TextureEntry<T>> {
        self.entries.get(key)
    }

    pub fn contains_id(&self, id: i32) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered IDs in ascending order
    pub fn ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Remove every entry, handing the handles back to the caller.
    pub fn drain(&mut self) -> Vec<TextureEntry<T>> {
        self.by_id.clear();
        self.entries.drain().map(|(_, entry)| entry).collect()
    }

    /// Forget every entry without returning the handles.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut registry = TextureRegistry::new();
        let (key, previous) = registry.insert(1, "atlas", 64, 32);
        assert!(previous.is_none());

        let (found, entry) = registry.lookup(1).unwrap();
        assert_eq!(found, key);
        assert_eq!(entry.handle, "atlas");
        assert_eq!((entry.width, entry.height), (64, 32));
        assert!(registry.lookup(2).is_none());
    }

    #[test]
    fn reinsert_returns_previous_entry() {
        let mut registry = TextureRegistry::new();
        let (old_key, _) = registry.insert(1, "a", 2, 2);
        let (new_key, previous) = registry.insert(1, "b", 4, 4);

        let (prev_key, prev) = previous.unwrap();
        assert_eq!(prev_key, old_key);
        assert_eq!(prev.handle, "a");
        assert_ne!(old_key, new_key);
        assert!(registry.get(old_key).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn removed_key_goes_stale() {
        let mut registry = TextureRegistry::new();
        let (key, _) = registry.insert(7, (), 8, 8);
        registry.remove(7);
        assert!(registry.get(key).is_none());

        // Same ID again gets a fresh generation.
        let (again, _) = registry.insert(7, (), 8, 8);
        assert_ne!(key, again);
        assert!(registry.get(key).is_none());
    }

    #[test]
    fn drain_empties_registry() {
        let mut registry = TextureRegistry::new();
        registry.insert(3, 30, 1, 1);
        registry.insert(FONT_TEXTURE_ID, 10, 1, 1);
        assert_eq!(registry.ids(), vec![-1, 3]);

        let mut handles: Vec<_> = registry.drain().into_iter().map(|e| e.handle).collect();
        handles.sort();
        assert_eq!(handles, vec![10, 30]);
        assert!(registry.is_empty());
        assert!(!registry.contains_id(3));
    }
}
