// (c) Roel Kluin, 2023, GPL v3

use super::{Bag, Item, ItemIter, Iterable};
use anyhow::{anyhow, ensure, Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

pub(crate) fn write_record<W: Write, T: Item>(w: &mut W, item: &T) -> Result<()> {
    bincode::serialize_into(w, item)?;
    Ok(())
}

pub(crate) fn read_record<R: Read, T: Item>(r: &mut R) -> Result<T> {
    Ok(bincode::deserialize_from(r)?)
}

/// Fixed-width records read back in write order.
pub(crate) struct Records<T> {
    reader: BufReader<File>,
    left: u64,
    _item: PhantomData<fn() -> T>,
}

impl<T: Item> Iterator for Records<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if self.left == 0 {
            return None;
        }
        self.left -= 1;
        Some(read_record(&mut self.reader))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, usize::try_from(self.left).ok())
    }
}

/// the first `n` records of the file at `path`.
pub(crate) fn read_records<T: Item>(path: &Path, n: u64) -> Result<Records<T>> {
    let file = File::open(path).with_context(|| format!("reopening {}", path.display()))?;
    Ok(Records {
        reader: BufReader::new(file),
        left: n,
        _item: PhantomData,
    })
}

/// Records appended sequentially to a file, iterated in write order.
///
/// A reopened store only opens its file for writing at the first append.
pub struct DiskStore<T> {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    visible: u64,
    pending: u64,
    // removes the file on drop, for anonymous stores.
    _temp: Option<TempPath>,
    _item: PhantomData<fn() -> T>,
}

impl<T: Item> DiskStore<T> {
    fn with_file(path: PathBuf, file: Option<File>, visible: u64, temp: Option<TempPath>) -> Self {
        DiskStore {
            path,
            writer: file.map(BufWriter::new),
            visible,
            pending: 0,
            _temp: temp,
            _item: PhantomData,
        }
    }

    /// A new, empty store that persists at `path`. An existing file is truncated.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self::with_file(path, Some(file), 0, None))
    }

    /// A store backed by an anonymous temporary file.
    pub fn temporary() -> Result<Self> {
        let temp = NamedTempFile::new()?.into_temp_path();
        let path = temp.to_path_buf();
        let file = OpenOptions::new().append(true).open(&path)?;
        Ok(Self::with_file(path, Some(file), 0, Some(temp)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        if self.writer.is_none() {
            let file = OpenOptions::new()
                .append(true)
                .open(&self.path)
                .with_context(|| format!("opening {} for writing", self.path.display()))?;
            self.writer = Some(BufWriter::new(file));
        }
        self.writer
            .as_mut()
            .ok_or_else(|| anyhow!("no writer for {}", self.path.display()))
    }
}

impl<T: Item + Default> DiskStore<T> {
    /// Re-attach to a file written earlier; all records in it are visible and
    /// new appends go to its end.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let record = bincode::serialized_size(&T::default())?;
        ensure!(record > 0, "zero-sized records");
        let len = std::fs::metadata(&path)
            .with_context(|| format!("opening {}", path.display()))?
            .len();
        ensure!(
            len % record == 0,
            "{}: {} bytes is not a whole number of {} byte records",
            path.display(),
            len,
            record
        );
        dbg_print!("reopened {} with {} records", path.display(), len / record);
        Ok(Self::with_file(path, None, len / record, None))
    }
}

impl<T: Item> Bag<T> for DiskStore<T> {
    fn append(&mut self, item: T) -> Result<()> {
        write_record(self.writer()?, &item)?;
        self.pending += 1;
        Ok(())
    }
    fn flush(&mut self) -> Result<()> {
        if let Some(w) = self.writer.as_mut() {
            w.flush()
                .with_context(|| format!("flushing {}", self.path.display()))?;
        }
        self.visible += self.pending;
        self.pending = 0;
        Ok(())
    }
}

impl<T: Item> Iterable<T> for DiskStore<T> {
    fn count(&self) -> u64 {
        self.visible
    }
    fn iterator(&self) -> Result<ItemIter<'_, T>> {
        Ok(Box::new(read_records::<T>(&self.path, self.visible)?))
    }
}
