use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::errors::Result;
use crate::utilities::{open_text, split_dump_line};

const SCIENTIFIC_NAME: &str = "scientific name";

/// Scientific name of every taxon in a `names.dmp` dump.
#[derive(Debug, Default)]
pub struct NameStore {
    names: HashMap<String, String>,
}

impl NameStore {
    /// Reads a names dump.
    ///
    /// # Arguments
    ///
    /// * `filename` - The path to `names.dmp` (plain or `.gz`).
    pub fn from_file<P: AsRef<Path>>(filename: P) -> Result<Self> {
        Self::from_reader(open_text(filename.as_ref())?)
    }

    /// Rows that do not split into exactly 4 fields are skipped. When a taxon
    /// has several scientific-name rows the first one is kept.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut names = HashMap::new();
        for line in reader.lines() {
            let line = line?;
            let fields = split_dump_line(&line);
            if fields.len() == 4 && fields[3].starts_with(SCIENTIFIC_NAME) {
                names
                    .entry(fields[0].to_string())
                    .or_insert_with(|| fields[1].to_string());
            }
        }
        Ok(NameStore { names })
    }

    pub fn get(&self, taxid: &str) -> Option<&str> {
        self.names.get(taxid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
