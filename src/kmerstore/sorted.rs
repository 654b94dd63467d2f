// (c) Roel Kluin, 2023, GPL v3

use super::disk::{read_records, write_record, Records};
use super::{Bag, Item, ItemIter, Iterable};
use anyhow::Result;
use itertools::Itertools;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

/// A sorted run on disk and its record count.
struct Run {
    path: TempPath,
    len: u64,
}

fn temp_file(dir: Option<&Path>) -> Result<NamedTempFile> {
    Ok(match dir {
        Some(dir) => NamedTempFile::new_in(dir)?,
        None => NamedTempFile::new()?,
    })
}

fn write_run<T, I>(dir: Option<&Path>, items: I) -> Result<Run>
where
    T: Item,
    I: Iterator<Item = Result<T>>,
{
    let mut temp = temp_file(dir)?;
    let mut len = 0;
    {
        let mut w = BufWriter::new(temp.as_file_mut());
        for item in items {
            write_record(&mut w, &item?)?;
            len += 1;
        }
        w.flush()?;
    }
    Ok(Run {
        path: temp.into_temp_path(),
        len,
    })
}

type Merged<T> = std::result::Result<Result<T>, (Result<T>, Result<T>)>;

/// coalesce step that drops repeats.
fn skip_repeat<T: PartialEq>(a: Result<T>, b: Result<T>) -> Merged<T> {
    match (a, b) {
        (Ok(x), Ok(y)) if x == y => Ok(Ok(x)),
        (a, b) => Err((a, b)),
    }
}

/// coalesce step that sums the counts of equal keys.
fn add_counts<T: PartialEq>(a: Result<(T, u32)>, b: Result<(T, u32)>) -> Merged<(T, u32)> {
    match (a, b) {
        (Ok((x, m)), Ok((y, n))) if x == y => Ok(Ok((x, m.saturating_add(n)))),
        (a, b) => Err((a, b)),
    }
}

/// k-way merge of sorted runs; the runs live as long as the merge.
struct MergeIter<T> {
    readers: Vec<Records<T>>,
    heap: BinaryHeap<Reverse<(T, usize)>>,
    _runs: Vec<Run>,
}

impl<T: Item + Ord> MergeIter<T> {
    fn new(runs: Vec<Run>) -> Result<Self> {
        let mut readers = runs
            .iter()
            .map(|run| read_records::<T>(&run.path, run.len))
            .collect::<Result<Vec<_>>>()?;
        let mut heap = BinaryHeap::with_capacity(readers.len());
        for (i, r) in readers.iter_mut().enumerate() {
            if let Some(item) = r.next() {
                heap.push(Reverse((item?, i)));
            }
        }
        Ok(MergeIter {
            readers,
            heap,
            _runs: runs,
        })
    }
}

impl<T: Item + Ord> Iterator for MergeIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        let Reverse((item, i)) = self.heap.pop()?;
        match self.readers[i].next() {
            Some(Ok(next)) => self.heap.push(Reverse((next, i))),
            Some(Err(e)) => return Some(Err(e)),
            None => {}
        }
        Some(Ok(item))
    }
}

/// Sorted set built by external merge sort: appends fill a bounded buffer that
/// is spilled as a sorted run, and `flush` merges all runs into one file.
pub struct SortedStore<T> {
    dir: Option<PathBuf>,
    run_capacity: usize,
    buffer: Vec<T>,
    runs: Vec<Run>,
    merged: Option<Run>,
}

impl<T: Item + Ord> SortedStore<T> {
    /// runs of at most `run_capacity` items, spilled to the system temp dir.
    pub fn new(run_capacity: usize) -> Self {
        SortedStore {
            dir: None,
            run_capacity: run_capacity.max(1),
            buffer: Vec::new(),
            runs: Vec::new(),
            merged: None,
        }
    }

    pub fn in_dir<P: AsRef<Path>>(dir: P, run_capacity: usize) -> Self {
        SortedStore {
            dir: Some(dir.as_ref().to_path_buf()),
            ..Self::new(run_capacity)
        }
    }

    fn spill(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.buffer.sort_unstable();
        self.buffer.dedup();
        let run = write_run(self.dir.as_deref(), self.buffer.drain(..).map(Ok))?;
        dbg_print!("spilled run {} of {} items", self.runs.len(), run.len);
        self.runs.push(run);
        Ok(())
    }
}

impl<T: Item + Ord> Bag<T> for SortedStore<T> {
    fn append(&mut self, item: T) -> Result<()> {
        self.buffer.push(item);
        if self.buffer.len() >= self.run_capacity {
            self.spill()?;
        }
        Ok(())
    }
    fn flush(&mut self) -> Result<()> {
        self.spill()?;
        if self.runs.is_empty() {
            return Ok(());
        }
        let mut inputs = std::mem::take(&mut self.runs);
        if let Some(prev) = self.merged.take() {
            inputs.push(prev);
        }
        let n = inputs.len();
        let merged = write_run(
            self.dir.as_deref(),
            MergeIter::<T>::new(inputs)?.coalesce(skip_repeat),
        )?;
        dbg_print!("merged {} runs into {} items", n, merged.len);
        self.merged = Some(merged);
        Ok(())
    }
}

impl<T: Item + Ord> Iterable<T> for SortedStore<T> {
    fn count(&self) -> u64 {
        self.merged.as_ref().map_or(0, |run| run.len)
    }
    fn iterator(&self) -> Result<ItemIter<'_, T>> {
        Ok(match &self.merged {
            Some(run) => Box::new(read_records(&run.path, run.len)?),
            None => Box::new(std::iter::empty()),
        })
    }
}

/// Occurrence counting by external sort. Pushed items fill a bounded buffer
/// that is spilled as a sorted run of `(item, count)` records; `finish` merges
/// the runs and sums the counts of equal items.
pub struct RunCounter<T> {
    dir: Option<PathBuf>,
    run_capacity: usize,
    buffer: Vec<T>,
    runs: Vec<Run>,
    pushed: u64,
}

/// distinct items in ascending order with their occurrence counts.
pub type Counted<T> = Box<dyn Iterator<Item = Result<(T, u32)>>>;

fn counted<T: Item + Ord>(buffer: &mut Vec<T>) -> impl Iterator<Item = Result<(T, u32)>> + '_ {
    buffer.sort_unstable();
    buffer
        .drain(..)
        .dedup_with_count()
        .map(|(n, item)| Ok((item, u32::try_from(n).unwrap_or(u32::MAX))))
}

impl<T: Item + Ord> RunCounter<T> {
    pub fn new(run_capacity: usize) -> Self {
        RunCounter {
            dir: None,
            run_capacity: run_capacity.max(1),
            buffer: Vec::new(),
            runs: Vec::new(),
            pushed: 0,
        }
    }

    pub fn in_dir<P: AsRef<Path>>(dir: P, run_capacity: usize) -> Self {
        RunCounter {
            dir: Some(dir.as_ref().to_path_buf()),
            ..Self::new(run_capacity)
        }
    }

    pub fn push(&mut self, item: T) -> Result<()> {
        self.buffer.push(item);
        self.pushed += 1;
        if self.buffer.len() >= self.run_capacity {
            self.spill()?;
        }
        Ok(())
    }

    /// number of items pushed so far, repeats included.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// number of runs spilled to disk so far.
    pub fn spilled(&self) -> usize {
        self.runs.len()
    }

    fn spill(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let run = write_run(self.dir.as_deref(), counted(&mut self.buffer))?;
        dbg_print!("spilled count run {} of {} items", self.runs.len(), run.len);
        self.runs.push(run);
        Ok(())
    }

    pub fn finish(mut self) -> Result<Counted<T>> {
        if self.runs.is_empty() {
            let all: Vec<_> = counted(&mut self.buffer).collect();
            return Ok(Box::new(all.into_iter()));
        }
        self.spill()?;
        dbg_print!("merging {} count runs", self.runs.len());
        let runs = std::mem::take(&mut self.runs);
        Ok(Box::new(MergeIter::<(T, u32)>::new(runs)?.coalesce(add_counts)))
    }
}
