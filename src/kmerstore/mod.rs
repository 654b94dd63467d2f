// (c) Roel Kluin, 2023, GPL v3

//! A collection is a bag (write facet: append, flush) and an iterable (read
//! facet: count, iterate, bulk copy). The index and graph only ever use these
//! traits, so backends can be swapped without touching them.

pub mod disk;
pub mod filtered;
pub mod memory;
pub mod sorted;

pub use disk::DiskStore;
pub use filtered::FilteredStore;
pub use memory::MemoryStore;
pub use sorted::{Counted, RunCounter, SortedStore};

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// What a collection can hold: plain values with a fixed-width bincode record.
pub trait Item: Copy + Send + Sync + Serialize + DeserializeOwned + 'static {}

impl<T> Item for T where T: Copy + Send + Sync + Serialize + DeserializeOwned + 'static {}

pub type ItemIter<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

/// Write facet. Appended items become visible at the next flush.
pub trait Bag<T: Item> {
    fn append(&mut self, item: T) -> Result<()>;

    fn append_slice(&mut self, items: &[T]) -> Result<()> {
        for &item in items {
            self.append(item)?;
        }
        Ok(())
    }

    /// all appends so far are visible to iterators created after this returns.
    fn flush(&mut self) -> Result<()>;
}

/// Read facet.
pub trait Iterable<T: Item> {
    /// number of visible items, equal to the length of a new iteration.
    fn count(&self) -> u64;

    /// a new forward iteration from the first visible item.
    fn iterator(&self) -> Result<ItemIter<'_, T>>;

    /// fill `buffer` from the start of the collection, return the filled part.
    fn bulk_copy<'b>(&self, buffer: &'b mut [T]) -> Result<&'b [T]> {
        let mut n = 0;
        for (slot, item) in buffer.iter_mut().zip(self.iterator()?) {
            *slot = item?;
            n += 1;
        }
        Ok(&buffer[..n])
    }
}

pub trait Collection<T: Item>: Bag<T> + Iterable<T> + Send + Sync {}

impl<T: Item, C> Collection<T> for C where C: Bag<T> + Iterable<T> + Send + Sync {}

impl<T: Item> Bag<T> for Box<dyn Collection<T>> {
    fn append(&mut self, item: T) -> Result<()> {
        (**self).append(item)
    }
    fn append_slice(&mut self, items: &[T]) -> Result<()> {
        (**self).append_slice(items)
    }
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<T: Item> Iterable<T> for Box<dyn Collection<T>> {
    fn count(&self) -> u64 {
        (**self).count()
    }
    fn iterator(&self) -> Result<ItemIter<'_, T>> {
        (**self).iterator()
    }
    fn bulk_copy<'b>(&self, buffer: &'b mut [T]) -> Result<&'b [T]> {
        (**self).bulk_copy(buffer)
    }
}
