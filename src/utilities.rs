use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::errors::{Result, SubnxError};

/// Field delimiter of the NCBI taxdump `.dmp` files.
pub const DUMP_DELIMITER: &str = "\t|\t";

/// Splits a taxdump line into its fields.
///
/// The trailing `\t|` terminator stays attached to the last field, so a
/// names line yields exactly 4 fields and a nodes line exactly 13.
///
/// # Arguments
///
/// * `line` - One line of a `.dmp` file, without the newline.
///
/// # Returns
///
/// The fields, borrowed from `line`.
pub fn split_dump_line(line: &str) -> Vec<&str> {
    line.split(DUMP_DELIMITER).collect()
}

/// Opens a text input for line-by-line streaming, decompressing on the fly
/// when the file name ends in `.gz`.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| SubnxError::open(path, e))?;
    let gzipped = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("gz"));
    if gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
