use std::sync::Arc;

use crate::container::Container;

/// Ordered mapping from chunk key to container
///
/// Keys are strictly ascending and no container is ever empty. Containers
/// are reference counted so that copy-on-write bitmaps can share them; every
/// mutable access goes through [`container_mut`](Self::container_mut), which
/// clones a shared container before handing it out.
#[derive(Clone, Debug, Default)]
pub(crate) struct ChunkIndex {
    keys: Vec<u16>,
    containers: Vec<Arc<Container>>,
}

impl ChunkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            containers: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn keys(&self) -> &[u16] {
        &self.keys
    }

    #[inline]
    pub fn position(&self, key: u16) -> Result<usize, usize> {
        self.keys.binary_search(&key)
    }

    pub fn get(&self, key: u16) -> Option<&Container> {
        self.position(key).ok().map(|i| &*self.containers[i])
    }

    #[inline]
    pub fn key_at(&self, index: usize) -> u16 {
        self.keys[index]
    }

    #[inline]
    pub fn container_at(&self, index: usize) -> &Container {
        &self.containers[index]
    }

    #[inline]
    pub fn shared_at(&self, index: usize) -> &Arc<Container> {
        &self.containers[index]
    }

    /// Pre-mutation hook: unshares the container at `index` if another
    /// bitmap still references it, then returns it for writing
    #[inline]
    pub fn container_mut(&mut self, index: usize) -> &mut Container {
        Arc::make_mut(&mut self.containers[index])
    }

    /// Index of the container for `key`, inserting an empty one if absent.
    /// The caller must fill it before the index is observed again.
    pub fn get_or_insert(&mut self, key: u16) -> usize {
        match self.position(key) {
            Ok(i) => i,
            Err(i) => {
                self.keys.insert(i, key);
                self.containers.insert(i, Arc::new(Container::default()));
                i
            }
        }
    }

    pub fn insert_at(&mut self, index: usize, key: u16, container: Container) {
        debug_assert!(!container.is_empty());
        self.keys.insert(index, key);
        self.containers.insert(index, Arc::new(container));
    }

    /// Appends an entry; `key` must exceed every key already present
    pub fn push(&mut self, key: u16, container: Container) {
        self.push_shared(key, Arc::new(container));
    }

    pub fn push_shared(&mut self, key: u16, container: Arc<Container>) {
        debug_assert!(self.keys.last().map_or(true, |&last| last < key));
        self.keys.push(key);
        self.containers.push(container);
    }

    /// Appends `container` shared when `share` is set, or as a private copy
    pub fn push_copy(&mut self, key: u16, container: &Arc<Container>, share: bool) {
        let container = if share {
            Arc::clone(container)
        } else {
            Arc::new(Container::clone(container))
        };
        self.push_shared(key, container);
    }

    pub fn remove_at(&mut self, index: usize) {
        self.keys.remove(index);
        self.containers.remove(index);
    }

    /// Drops the entry at `index` if its container became empty
    pub fn remove_if_empty(&mut self, index: usize) {
        if self.containers[index].is_empty() {
            self.remove_at(index);
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.containers.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (u16, &Container)> + ExactSizeIterator {
        self.keys
            .iter()
            .copied()
            .zip(self.containers.iter().map(|c| &**c))
    }

    /// Mutable access to the containers no other bitmap shares
    pub fn unique_containers_mut(&mut self) -> impl Iterator<Item = &mut Container> {
        self.containers.iter_mut().filter_map(Arc::get_mut)
    }

    pub fn into_entries(self) -> impl Iterator<Item = (u16, Arc<Container>)> {
        self.keys.into_iter().zip(self.containers)
    }

    /// Drops every empty container
    pub fn retain_nonempty(&mut self) {
        let entries = std::mem::take(self);
        for (key, container) in entries.into_entries() {
            if !container.is_empty() {
                self.push_shared(key, container);
            }
        }
    }

    /// Copy sharing every container
    pub fn shallow_clone(&self) -> Self {
        self.clone()
    }

    /// Copy owning a private clone of every container
    pub fn deep_clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            containers: self
                .containers
                .iter()
                .map(|c| Arc::new(Container::clone(c)))
                .collect(),
        }
    }

    /// Releases spare capacity, leaving shared containers untouched.
    /// Returns the number of bytes reclaimed.
    pub fn shrink_to_fit(&mut self) -> usize {
        let before = self.keys.capacity() * std::mem::size_of::<u16>()
            + self.containers.capacity() * std::mem::size_of::<Arc<Container>>();
        self.keys.shrink_to_fit();
        self.containers.shrink_to_fit();
        let after = self.keys.capacity() * std::mem::size_of::<u16>()
            + self.containers.capacity() * std::mem::size_of::<Arc<Container>>();
        let containers: usize = self
            .containers
            .iter_mut()
            .filter_map(Arc::get_mut)
            .map(Container::shrink_to_fit)
            .sum();
        before - after + containers
    }
}
