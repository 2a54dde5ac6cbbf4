use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::accession::AccessionFilter;
use crate::errors::{Result, SubnxError};
use crate::seq_index::IndexEntry;
use crate::taxonomy::TaxonomyTree;

/// Writes one `accession.version\tlineage` line per index entry.
///
/// # Arguments
///
/// * `entries` - Index entries to report, in output order.
/// * `accessions` - Accession to taxon ID mapping the entries were selected with.
/// * `taxonomy` - The taxonomy tree.
/// * `full_lineage` - Every rank in full instead of abbreviated principal ranks.
/// * `writer` - Destination of the report.
///
/// An entry whose accession has no taxon, or whose taxon is not in the tree,
/// means the inputs disagree and aborts the report.
pub fn write_taxa<W: Write>(
    entries: &[IndexEntry],
    accessions: &AccessionFilter,
    taxonomy: &TaxonomyTree,
    full_lineage: bool,
    mut writer: W,
) -> Result<()> {
    let principal_only = !full_lineage;
    for entry in entries {
        let taxid = accessions
            .taxid(&entry.accession)
            .ok_or_else(|| SubnxError::UnmappedAccession(entry.accession.clone()))?;
        let position = taxonomy.position(taxid)?;
        writeln!(
            writer,
            "{}\t{}",
            entry.accession_version,
            taxonomy.lineage(position, principal_only)
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_taxa_file<P: AsRef<Path>>(
    entries: &[IndexEntry],
    accessions: &AccessionFilter,
    taxonomy: &TaxonomyTree,
    full_lineage: bool,
    filename: P,
) -> Result<()> {
    let filename = filename.as_ref();
    let file = File::create(filename).map_err(|e| SubnxError::open(filename, e))?;
    write_taxa(entries, accessions, taxonomy, full_lineage, BufWriter::new(file))
}

/// Copies the byte range of every entry from `source` to `writer`, verbatim
/// and in entry order.
pub fn write_seqs<R: Read + Seek, W: Write>(
    mut source: R,
    entries: &[IndexEntry],
    mut writer: W,
) -> Result<()> {
    for entry in entries {
        source.seek(SeekFrom::Start(entry.offset))?;
        let copied = io::copy(&mut (&mut source).take(entry.length), &mut writer)?;
        if copied != entry.length {
            return Err(SubnxError::TruncatedRecord {
                accession: entry.accession_version.clone(),
                expected: entry.length,
                actual: copied,
            });
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_seqs_file<P: AsRef<Path>, Q: AsRef<Path>>(
    sequences: P,
    entries: &[IndexEntry],
    filename: Q,
) -> Result<()> {
    let sequences = sequences.as_ref();
    let filename = filename.as_ref();
    let input = File::open(sequences).map_err(|e| SubnxError::open(sequences, e))?;
    let output = File::create(filename).map_err(|e| SubnxError::open(filename, e))?;
    write_seqs(BufReader::new(input), entries, BufWriter::new(output))
}
