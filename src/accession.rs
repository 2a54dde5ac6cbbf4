use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use log::debug;

use crate::errors::Result;
use crate::utilities::open_text;

const ACCESSION_FIELD_COUNT: usize = 4;

/// Accession to taxon ID mapping, restricted to a set of taxa of interest.
#[derive(Debug, Default)]
pub struct AccessionFilter {
    accession2taxid: HashMap<String, String>,
}

impl AccessionFilter {
    /// Streams one or more `accession2taxid` files (plain or `.gz`) in order.
    /// An accession seen in an earlier file is not overridden by a later one.
    ///
    /// # Arguments
    ///
    /// * `filenames` - The accession map files.
    /// * `taxids` - Only rows mapping to one of these taxa are kept.
    pub fn from_files<P: AsRef<Path>>(filenames: &[P], taxids: &HashSet<String>) -> Result<Self> {
        let mut filter = AccessionFilter::default();
        for filename in filenames {
            let filename = filename.as_ref();
            let before = filter.len();
            filter.extend_from_reader(open_text(filename)?, taxids)?;
            debug!(
                "{} related accessions in {}",
                filter.len() - before,
                filename.display()
            );
        }
        Ok(filter)
    }

    pub fn from_reader<R: BufRead>(reader: R, taxids: &HashSet<String>) -> Result<Self> {
        let mut filter = AccessionFilter::default();
        filter.extend_from_reader(reader, taxids)?;
        Ok(filter)
    }

    /// The first line is a header and is always skipped, as are rows without
    /// exactly 4 tab-separated columns.
    fn extend_from_reader<R: BufRead>(&mut self, reader: R, taxids: &HashSet<String>) -> Result<()> {
        for line in reader.lines().skip(1) {
            let line = line?;
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() == ACCESSION_FIELD_COUNT && taxids.contains(fields[2]) {
                self.accession2taxid
                    .entry(fields[0].to_string())
                    .or_insert_with(|| fields[2].to_string());
            }
        }
        Ok(())
    }

    pub fn taxid(&self, accession: &str) -> Option<&str> {
        self.accession2taxid.get(accession).map(String::as_str)
    }

    /// The accessions kept, used to filter the sequence index.
    pub fn accessions(&self) -> HashSet<String> {
        self.accession2taxid.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.accession2taxid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accession2taxid.is_empty()
    }
}
