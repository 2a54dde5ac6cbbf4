//! Byte-offset index over a FASTA file, keyed by accession.
//!
//! The index is a tab-separated text file with one line per record, in file
//! order:
//!
//! ```text
//! X17276	X17276.1	0	601
//! HG799543	HG799543.1	601	396
//! ```
//!
//! Columns are accession, accession with version, offset of the record's
//! header line, and the length of the record in bytes (header plus body up to
//! the next header or end of file). Reading `length` bytes at `offset`
//! reproduces the record exactly.
//!
//! Building the index scans the whole sequence file once, which takes about an
//! hour for a full nt file. The result is kept next to the sequence file and
//! reused on later runs; nothing checks whether it still matches the sequence
//! file.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::errors::{Result, SubnxError};

/// Appended to the sequence file path to locate its index.
pub const INDEX_SUFFIX: &str = ".fai";

const TMP_SUFFIX: &str = ".tmp";
const PROGRESS_INTERVAL: usize = 1_000_000;

/// One record of the sequence file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub accession: String,
    pub accession_version: String,
    /// Byte offset of the header line
    pub offset: u64,
    /// Bytes from `offset` to the next header line or end of file
    pub length: u64,
}

impl IndexEntry {
    pub fn new(accession: &str, accession_version: &str, offset: u64, length: u64) -> Self {
        IndexEntry {
            accession: accession.to_string(),
            accession_version: accession_version.to_string(),
            offset,
            length,
        }
    }

    /// Identifiers from a header line such as `>ON631770.1 Colletotrichum ...`.
    ///
    /// The accession runs up to the first `.`; the versioned accession runs up
    /// to the first space after that `.`. Missing delimiters extend either one
    /// to the end of the line.
    fn from_header(header: &[u8], offset: u64) -> Self {
        let text = String::from_utf8_lossy(header);
        let name = text.strip_prefix('>').unwrap_or(&text[..]);

        let dot = name.find('.');
        let accession = &name[..dot.unwrap_or(name.len())];
        let version_start = dot.map_or(0, |dot| dot + 1);
        let accession_version = match name[version_start..].find(' ') {
            Some(space) => &name[..version_start + space],
            None => name,
        };
        IndexEntry::new(accession, accession_version, offset, 0)
    }

    /// Parses one index line. `source` and the 1-based line `number` are
    /// only used in errors.
    fn from_line(line: &str, source: &Path, number: usize) -> Result<Self> {
        let mut fields = line.split('\t');
        let accession = fields.next().unwrap_or_default();
        let accession_version = fields.next().unwrap_or_default();
        let offset = parse_u64(fields.next(), "offset", source, number)?;
        let length = parse_u64(fields.next(), "length", source, number)?;
        Ok(IndexEntry::new(accession, accession_version, offset, length))
    }

    fn write_line<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            self.accession, self.accession_version, self.offset, self.length
        )
    }
}

fn parse_u64(field: Option<&str>, name: &'static str, source: &Path, number: usize) -> Result<u64> {
    let value = field.unwrap_or_default();
    value.parse::<u64>().map_err(|_| SubnxError::Parse {
        path: source.to_path_buf(),
        line: number,
        field: name,
        value: value.to_string(),
    })
}

/// `<sequences>.fai`
pub fn index_path(sequences: &Path) -> PathBuf {
    let mut path = OsString::from(sequences.as_os_str());
    path.push(INDEX_SUFFIX);
    PathBuf::from(path)
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

/// Advances past the current line without buffering it.
///
/// # Returns
///
/// The number of bytes consumed, newline included.
fn skip_line<R: BufRead>(reader: &mut R) -> io::Result<u64> {
    let mut skipped = 0;
    loop {
        let (found, used) = {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(skipped);
            }
            match buf.iter().position(|&b| b == b'\n') {
                Some(newline) => (true, newline + 1),
                None => (false, buf.len()),
            }
        };
        reader.consume(used);
        skipped += used as u64;
        if found {
            return Ok(skipped);
        }
    }
}

/// Scans a FASTA stream and writes one index line per record.
///
/// # Arguments
///
/// * `reader` - The sequence file, positioned at its first byte.
/// * `writer` - Destination of the index lines.
/// * `source` - Name of the sequence file, for error messages.
///
/// # Returns
///
/// The number of records indexed.
pub fn build_from_reader<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    source: &Path,
) -> Result<usize> {
    let mut header = Vec::with_capacity(256);
    let mut position = reader.read_until(b'\n', &mut header)? as u64;
    let first = trim_line_end(&header);
    if first.len() < 3 || first[0] != b'>' {
        return Err(SubnxError::InvalidFormat {
            path: source.to_path_buf(),
        });
    }

    let show_progress = atty::is(atty::Stream::Stderr);
    let mut current = IndexEntry::from_header(first, 0);
    let mut records = 0;

    loop {
        let next = {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            buf[0]
        };
        if next != b'>' {
            position += skip_line(&mut reader)?;
            continue;
        }

        current.length = position - current.offset;
        current.write_line(&mut writer)?;
        records += 1;
        if show_progress && records % PROGRESS_INTERVAL == 0 {
            eprint!("\rIndexed {} records...", records);
        }

        header.clear();
        let read = reader.read_until(b'\n', &mut header)?;
        current = IndexEntry::from_header(trim_line_end(&header), position);
        position += read as u64;
    }

    current.length = position - current.offset;
    current.write_line(&mut writer)?;
    records += 1;
    writer.flush()?;

    if show_progress && records >= PROGRESS_INTERVAL {
        eprint!("\r");
    }
    Ok(records)
}

/// Reads index lines, keeping the entries whose accession is in `accessions`.
/// Entries come back in file order.
pub fn parse_from_reader<R: BufRead>(
    reader: R,
    accessions: &HashSet<String>,
    source: &Path,
) -> Result<Vec<IndexEntry>> {
    let mut entries = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let accession = line.split('\t').next().unwrap_or_default();
        if accessions.contains(accession) {
            entries.push(IndexEntry::from_line(&line, source, i + 1)?);
        }
    }
    Ok(entries)
}

/// The index of one sequence file and where it lives on disk.
#[derive(Debug, Clone)]
pub struct SequenceIndex {
    sequences: PathBuf,
    path: PathBuf,
}

impl SequenceIndex {
    /// Index stored at the default location, `<sequences>.fai`.
    pub fn new<P: AsRef<Path>>(sequences: P) -> Self {
        let sequences = sequences.as_ref().to_path_buf();
        let path = index_path(&sequences);
        SequenceIndex { sequences, path }
    }

    pub fn with_path<P: AsRef<Path>, Q: AsRef<Path>>(sequences: P, path: Q) -> Self {
        SequenceIndex {
            sequences: sequences.as_ref().to_path_buf(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sequences(&self) -> &Path {
        &self.sequences
    }

    /// Presence of the file is taken as proof that the index is valid.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Scans the sequence file and writes the index, replacing any existing
    /// one. The index is written to a temporary sibling first and renamed into
    /// place when complete, so an interrupted build leaves no index behind.
    pub fn build(&self) -> Result<usize> {
        let input = File::open(&self.sequences).map_err(|e| SubnxError::open(&self.sequences, e))?;

        let mut tmp = OsString::from(self.path.as_os_str());
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);
        let output = File::create(&tmp).map_err(|e| SubnxError::open(&tmp, e))?;

        let built = build_from_reader(
            BufReader::with_capacity(1 << 20, input),
            BufWriter::new(output),
            &self.sequences,
        );
        let records = match built {
            Ok(records) => records,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(SubnxError::Rename {
                from: tmp,
                to: self.path.clone(),
                source: e,
            });
        }
        debug!("Indexed {} records into {}", records, self.path.display());
        Ok(records)
    }

    /// Builds the index unless it already exists.
    ///
    /// # Returns
    ///
    /// Whether a build took place.
    pub fn ensure(&self) -> Result<bool> {
        if self.exists() {
            debug!("Reusing index {}", self.path.display());
            return Ok(false);
        }
        info!("Indexing, estimated time required: 1 hour (required only for the first run)");
        self.build()?;
        Ok(true)
    }

    /// Entries for the given accessions, in sequence file order.
    pub fn entries(&self, accessions: &HashSet<String>) -> Result<Vec<IndexEntry>> {
        let file = File::open(&self.path).map_err(|e| SubnxError::open(&self.path, e))?;
        parse_from_reader(BufReader::new(file), accessions, &self.path)
    }
}
