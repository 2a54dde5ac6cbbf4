use std::path::{Path, PathBuf};

use clap::Parser;

use crate::errors::{Result, SubnxError};
use crate::seq_index::{index_path, SequenceIndex};

pub const NAMES_FILENAME: &str = "names.dmp";
pub const NODES_FILENAME: &str = "nodes.dmp";

/// Extract every nt/nr sequence that belongs to a taxon or its descendants,
/// together with its lineage.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Options {
    /// taxon ID (e.g., 5455 for Colletotrichum)
    #[clap(short = 'i', long = "id", value_parser)]
    pub taxid: String,

    /// decompressed taxdmp.zip directory
    #[clap(short = 't', long, value_parser)]
    pub taxdmp_dir: PathBuf,

    /// accession2taxid file, plain or gzipped (repeat for several files)
    #[clap(short = 'a', long = "accession2taxid-file", value_parser, required = true)]
    pub accession2taxid_files: Vec<PathBuf>,

    /// decompressed nt/nr sequences file
    #[clap(short = 'n', long, value_parser)]
    pub nx_file: PathBuf,

    /// output full lineage instead of principal ranks only
    #[clap(short = 'f', long, action)]
    pub full_lineage: bool,

    /// output sequences file, omit if not provided
    #[clap(short = 's', long, value_parser)]
    pub output_seqs_file: Option<PathBuf>,

    /// output taxa file
    #[clap(short = 'T', long, value_parser)]
    pub output_taxa_file: PathBuf,

    /// sequence index location [default: <NX_FILE>.fai]
    #[clap(long, value_parser)]
    pub index_file: Option<PathBuf>,

    /// rebuild the sequence index even if it already exists
    #[clap(long, action)]
    pub rebuild_index: bool,
}

impl Options {
    /// Names dump inside the taxdump directory, preferring a plain file over
    /// a `.gz` one.
    pub fn names_file(&self) -> PathBuf {
        dump_file(&self.taxdmp_dir, NAMES_FILENAME)
    }

    pub fn nodes_file(&self) -> PathBuf {
        dump_file(&self.taxdmp_dir, NODES_FILENAME)
    }

    pub fn index_file(&self) -> PathBuf {
        self.index_file
            .clone()
            .unwrap_or_else(|| index_path(&self.nx_file))
    }

    pub fn sequence_index(&self) -> SequenceIndex {
        SequenceIndex::with_path(&self.nx_file, self.index_file())
    }

    /// Checks that every input exists before any work starts.
    pub fn validate(&self) -> Result<()> {
        require(&self.taxdmp_dir)?;
        require(&self.nx_file)?;
        for file in &self.accession2taxid_files {
            require(file)?;
        }
        require(&self.names_file())?;
        require(&self.nodes_file())?;
        Ok(())
    }
}

fn dump_file(dir: &Path, filename: &str) -> PathBuf {
    let plain = dir.join(filename);
    if plain.exists() {
        return plain;
    }
    let gzipped = dir.join(format!("{}.gz", filename));
    if gzipped.exists() {
        gzipped
    } else {
        plain
    }
}

fn require(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(SubnxError::MissingPath(path.to_path_buf()))
    }
}
