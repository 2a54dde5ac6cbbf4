use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubnxError>;

#[derive(Debug, Error)]
pub enum SubnxError {
    /// A file could not be opened or created.
    #[error("{}: Failed to open file", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0}: Taxon ID not found")]
    NotFound(String),

    #[error("{0}: No scientific name for taxon ID")]
    MissingName(String),

    #[error("{}: Invalid fasta file", .path.display())]
    InvalidFormat { path: PathBuf },

    /// Malformed numeric column in a sequence index line (1-based line number).
    #[error("{}: line {line}: invalid {field} `{value}`", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("{0}: Accession has no taxon ID mapping")]
    UnmappedAccession(String),

    /// The sequence file ended before the byte range of an index entry.
    #[error("{accession}: expected {expected} bytes, read {actual} (stale index?)")]
    TruncatedRecord {
        accession: String,
        expected: u64,
        actual: u64,
    },

    /// A finished file could not be moved into place.
    #[error("{} -> {}: Failed to rename file", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: Invalid {kind} file", .path.display())]
    EmptyDump { path: PathBuf, kind: &'static str },

    #[error("{}: No such file or directory", .0.display())]
    MissingPath(PathBuf),
}

impl SubnxError {
    pub fn open(path: &Path, source: io::Error) -> Self {
        SubnxError::Open {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Prints the full error chain and terminates the process.
pub fn exit_with_error(err: &anyhow::Error) -> ! {
    eprintln!("Error: {}", err);
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {}", cause);
    }
    std::process::exit(1);
}
