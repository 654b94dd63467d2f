// (c) Roel Kluin, 2023, GPL v3

use anyhow::{anyhow, bail, Result};
use flate2::bufread::MultiGzDecoder;
use noodles_fasta as fasta;
use noodles_fastq as fastq;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A named raw nucleotide sequence.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

/// Source of sequences for graph construction.
pub type Bank = Box<dyn Iterator<Item = Result<SeqRecord>> + Send>;

type Input = Box<dyn BufRead + Send>;

/// Open a file, transparently decompressing gzip or bgzip.
fn open_input(path: &Path) -> Result<Input> {
    let mut reader = File::open(path)
        .map(BufReader::new)
        .map_err(|e| anyhow!("Error opening {}: {}", path.display(), e))?;
    if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        dbg_print!("{} is gzipped", path.display());
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

pub fn parse_fasta_file(path: &Path) -> Result<fasta::Reader<Input>> {
    open_input(path).map(fasta::Reader::new)
}

pub fn fasta_records<R: BufRead + Send + 'static>(mut reader: fasta::Reader<R>) -> Bank {
    Box::new(std::iter::from_fn(move || {
        reader.records().next().map(|res| -> Result<SeqRecord> {
            let record = res?;
            Ok(SeqRecord::new(
                record.name().to_string(),
                record.sequence().as_ref().to_vec(),
            ))
        })
    }))
}

pub fn fastq_records<R: BufRead + Send + 'static>(mut reader: fastq::Reader<R>) -> Bank {
    Box::new(std::iter::from_fn(move || {
        reader.records().next().map(|res| -> Result<SeqRecord> {
            let record = res?;
            Ok(SeqRecord::new(
                String::from_utf8_lossy(record.name()).into_owned(),
                record.sequence().to_vec(),
            ))
        })
    }))
}

/// Sequences of a FASTA or FASTQ file, optionally gzipped; the format is
/// recognized from the first character.
pub fn open_bank(path: &Path) -> Result<Bank> {
    let mut input = open_input(path)?;
    let first = input.fill_buf()?.first().copied();
    Ok(match first {
        Some(b'>') => fasta_records(fasta::Reader::new(input)),
        Some(b'@') => fastq_records(fastq::Reader::new(input)),
        None => Box::new(std::iter::empty()),
        Some(c) => bail!("{}: neither FASTA nor FASTQ (starts with {:?})", path.display(), c as char),
    })
}
