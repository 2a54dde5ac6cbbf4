use std::time::Instant;

use log::{debug, info};

use crate::accession::AccessionFilter;
use crate::errors::{Result, SubnxError};
use crate::names::NameStore;
use crate::options::Options;
use crate::results::{write_seqs_file, write_taxa_file};
use crate::taxonomy::TaxonomyTree;

/// Counts from one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub nodes: usize,
    pub descendants: usize,
    pub accessions: usize,
    pub records: usize,
    pub index_built: bool,
}

/// Runs the whole extraction: taxonomy, descendant taxa, related accessions,
/// sequence index, then the taxa report and optional sequences.
pub fn run(opts: &Options) -> Result<Summary> {
    let start = Instant::now();
    let mut summary = Summary::default();

    let names_file = opts.names_file();
    let names = NameStore::from_file(&names_file)?;
    if names.is_empty() {
        return Err(SubnxError::EmptyDump {
            path: names_file,
            kind: "names",
        });
    }
    let nodes_file = opts.nodes_file();
    let taxonomy = TaxonomyTree::from_file(&nodes_file, &names)?;
    if taxonomy.is_empty() {
        return Err(SubnxError::EmptyDump {
            path: nodes_file,
            kind: "nodes",
        });
    }
    drop(names);
    summary.nodes = taxonomy.len();
    info!(
        "Loaded {} nodes from {}",
        summary.nodes,
        opts.taxdmp_dir.display()
    );

    let taxids = taxonomy.descendant_taxids(&opts.taxid)?;
    summary.descendants = taxids.len();
    info!(
        "Traced {} descendant nodes for node {}",
        summary.descendants, opts.taxid
    );

    let accessions = AccessionFilter::from_files(&opts.accession2taxid_files, &taxids)?;
    summary.accessions = accessions.len();
    info!("Found {} related accessions", summary.accessions);

    let index = opts.sequence_index();
    summary.index_built = if opts.rebuild_index {
        info!("Rebuilding index {}", index.path().display());
        index.build()?;
        true
    } else {
        index.ensure()?
    };

    let entries = index.entries(&accessions.accessions())?;
    summary.records = entries.len();
    info!(
        "Found {} accessions existing in {}",
        summary.records,
        opts.nx_file.display()
    );

    write_taxa_file(
        &entries,
        &accessions,
        &taxonomy,
        opts.full_lineage,
        &opts.output_taxa_file,
    )?;
    info!(
        "Taxonomic information has been written to {}",
        opts.output_taxa_file.display()
    );
    if let Some(output_seqs_file) = &opts.output_seqs_file {
        write_seqs_file(&opts.nx_file, &entries, output_seqs_file)?;
        info!(
            "Sequences have been written to {}",
            output_seqs_file.display()
        );
    }

    drop(taxonomy);
    debug!("Released taxonomy tree");
    info!(
        "Finished. Total time elapsed: {}s",
        start.elapsed().as_secs()
    );
    Ok(summary)
}
