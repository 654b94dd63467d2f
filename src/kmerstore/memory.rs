// (c) Roel Kluin, 2023, GPL v3

use super::{Bag, Item, ItemIter, Iterable};
use anyhow::Result;

/// Growable in-memory collection.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore<T> {
    visible: Vec<T>,
    pending: Vec<T>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        MemoryStore {
            visible: Vec::new(),
            pending: Vec::new(),
        }
    }
    pub fn with_capacity(n: usize) -> Self {
        MemoryStore {
            visible: Vec::with_capacity(n),
            pending: Vec::new(),
        }
    }
    /// the visible items.
    pub fn as_slice(&self) -> &[T] {
        &self.visible
    }
}

impl<T: Item> From<Vec<T>> for MemoryStore<T> {
    fn from(visible: Vec<T>) -> Self {
        MemoryStore {
            visible,
            pending: Vec::new(),
        }
    }
}

impl<T: Item> Bag<T> for MemoryStore<T> {
    fn append(&mut self, item: T) -> Result<()> {
        self.pending.push(item);
        Ok(())
    }
    fn append_slice(&mut self, items: &[T]) -> Result<()> {
        self.pending.extend_from_slice(items);
        Ok(())
    }
    fn flush(&mut self) -> Result<()> {
        self.visible.append(&mut self.pending);
        Ok(())
    }
}

impl<T: Item> Iterable<T> for MemoryStore<T> {
    fn count(&self) -> u64 {
        self.visible.len() as u64
    }
    fn iterator(&self) -> Result<ItemIter<'_, T>> {
        Ok(Box::new(self.visible.iter().copied().map(Ok)))
    }
    fn bulk_copy<'b>(&self, buffer: &'b mut [T]) -> Result<&'b [T]> {
        let n = buffer.len().min(self.visible.len());
        buffer[..n].copy_from_slice(&self.visible[..n]);
        Ok(&buffer[..n])
    }
}
