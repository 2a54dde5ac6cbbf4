use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use subnx::accession::AccessionFilter;
use subnx::extract::run;
use subnx::names::NameStore;
use subnx::options::Options;
use subnx::results::write_seqs_file;
use subnx::seq_index::{IndexEntry, SequenceIndex};
use subnx::taxonomy::TaxonomyTree;
use subnx::SubnxError;

const TAXDMP_DIR: &str = "tests/data/taxdmp";
const ACCESSION_FILE: &str = "tests/data/nucl_gb.accession2taxid";
const NT_FILE: &str = "tests/data/nt";

const COCCODES_LINEAGE: &str = "k__Fungi; p__Ascomycota; c__Sordariomycetes; o__Glomerellales; \
                                f__Glomerellaceae; g__Colletotrichum; s__Colletotrichum_coccodes";
const LAGENARIA_LINEAGE: &str = "k__Fungi; p__Ascomycota; c__Sordariomycetes; o__Glomerellales; \
                                 f__Glomerellaceae; g__Colletotrichum; s__Colletotrichum_lagenaria";

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn load_taxonomy() -> TaxonomyTree {
    let names = NameStore::from_file(Path::new(TAXDMP_DIR).join("names.dmp")).unwrap();
    TaxonomyTree::from_file(Path::new(TAXDMP_DIR).join("nodes.dmp"), &names).unwrap()
}

/// Copies the nt fixture so the index is written outside the source tree.
fn scratch_nt(dir: &Path) -> PathBuf {
    let nt = dir.join("nt");
    fs::copy(NT_FILE, &nt).unwrap();
    nt
}

fn options(dir: &Path, taxid: &str) -> Options {
    Options {
        taxid: taxid.to_string(),
        taxdmp_dir: PathBuf::from(TAXDMP_DIR),
        accession2taxid_files: vec![PathBuf::from(ACCESSION_FILE)],
        nx_file: scratch_nt(dir),
        full_lineage: false,
        output_seqs_file: Some(dir.join("seqs.fa")),
        output_taxa_file: dir.join("taxa.tsv"),
        index_file: None,
        rebuild_index: false,
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_names_from_dump() {
        let names = NameStore::from_file(Path::new(TAXDMP_DIR).join("names.dmp")).unwrap();
        assert_eq!(names.len(), 18);
        assert_eq!(names.get("1"), Some("root"));
        assert_eq!(names.get("147538"), Some("Pezizomycotina"));
        assert_eq!(names.get("1028384"), Some("Glomerellales"));

        let wrong_file = NameStore::from_file(Path::new(TAXDMP_DIR).join("nodes.dmp")).unwrap();
        assert!(wrong_file.is_empty());
    }

    #[test]
    fn test_taxonomy_from_dump() {
        let tree = load_taxonomy();
        assert_eq!(tree.len(), 18);

        let species = tree.position("5462").unwrap();
        assert_eq!(tree.lineage(species, true), LAGENARIA_LINEAGE);
        assert_eq!(tree.parent(species).unwrap().taxid, "5455");

        let genus = tree.position("5455").unwrap();
        let children: Vec<&str> = tree.children(genus).map(|n| n.taxid.as_str()).collect();
        assert_eq!(children, vec!["5462", "27358"]);

        let names = NameStore::from_file(Path::new(TAXDMP_DIR).join("names.dmp")).unwrap();
        let wrong_file =
            TaxonomyTree::from_file(Path::new(TAXDMP_DIR).join("names.dmp"), &names).unwrap();
        assert!(wrong_file.is_empty());
    }

    #[test]
    fn test_accessions_for_descendants() {
        let tree = load_taxonomy();

        let genus = tree.descendant_taxids("5455").unwrap();
        let filter = AccessionFilter::from_files(&[ACCESSION_FILE], &genus).unwrap();
        assert_eq!(filter.accessions(), set(&["HG799543", "MN000001", "ON631770"]));
        assert_eq!(filter.taxid("HG799543"), Some("27358"));
        assert_eq!(filter.taxid("ON631770"), Some("5462"));
        assert_eq!(filter.taxid("X17276"), None);

        let leaf = tree.descendant_taxids("5462").unwrap();
        let filter = AccessionFilter::from_files(&[ACCESSION_FILE], &leaf).unwrap();
        assert_eq!(filter.accessions(), set(&["MN000001", "ON631770"]));
    }

    #[test]
    fn test_index_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let nt = scratch_nt(dir.path());
        let index = SequenceIndex::new(&nt);
        assert_eq!(index.path(), dir.path().join("nt.fai"));

        assert_eq!(index.build().unwrap(), 3);
        assert!(!dir.path().join("nt.fai.tmp").exists());

        let all = index.entries(&set(&["X17276", "HG799543", "ON631770"])).unwrap();
        assert_eq!(
            all,
            vec![
                IndexEntry::new("X17276", "X17276.1", 0, 601),
                IndexEntry::new("HG799543", "HG799543.1", 601, 396),
                IndexEntry::new("ON631770", "ON631770.1", 997, 797),
            ]
        );

        let subset = index.entries(&set(&["ON631770", "HG799543"])).unwrap();
        assert_eq!(subset, all[1..].to_vec());

        let extracted = dir.path().join("seqs.fa");
        write_seqs_file(&nt, &subset, &extracted).unwrap();
        let original = fs::read(&nt).unwrap();
        assert_eq!(fs::read(&extracted).unwrap(), original[601..].to_vec());
    }

    #[test]
    fn test_existing_index_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let missing_nt = dir.path().join("nt");
        let index = SequenceIndex::new(&missing_nt);
        fs::write(index.path(), "MARKER\tMARKER.1\t0\t1\n").unwrap();

        // the sequence file does not even exist, so a rebuild would fail
        assert!(!index.ensure().unwrap());
        assert_eq!(
            fs::read_to_string(index.path()).unwrap(),
            "MARKER\tMARKER.1\t0\t1\n"
        );
        assert!(matches!(index.build().unwrap_err(), SubnxError::Open { .. }));
    }

    #[test]
    fn test_invalid_sequence_file() {
        let dir = tempfile::tempdir().unwrap();
        let nt = dir.path().join("nt");
        fs::write(&nt, "ACGT\n>A.1 a\nACGT\n").unwrap();
        let index = SequenceIndex::new(&nt);
        assert!(matches!(
            index.ensure().unwrap_err(),
            SubnxError::InvalidFormat { .. }
        ));
        assert!(!index.exists());
    }

    #[test]
    fn test_run_extracts_genus() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), "5455");
        opts.validate().unwrap();

        let summary = run(&opts).unwrap();
        assert_eq!(summary.nodes, 18);
        assert_eq!(summary.descendants, 3);
        assert_eq!(summary.accessions, 3);
        assert_eq!(summary.records, 2);
        assert!(summary.index_built);

        assert_eq!(
            fs::read_to_string(&opts.output_taxa_file).unwrap(),
            format!(
                "HG799543.1\t{}\nON631770.1\t{}\n",
                COCCODES_LINEAGE, LAGENARIA_LINEAGE
            )
        );
        let original = fs::read(&opts.nx_file).unwrap();
        assert_eq!(
            fs::read(opts.output_seqs_file.as_ref().unwrap()).unwrap(),
            original[601..].to_vec()
        );

        let again = run(&opts).unwrap();
        assert!(!again.index_built);
        assert_eq!(again.records, 2);
    }

    #[test]
    fn test_run_full_lineage_without_sequences() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path(), "27358");
        opts.full_lineage = true;
        opts.output_seqs_file = None;

        let summary = run(&opts).unwrap();
        assert_eq!(summary.records, 1);
        let taxa = fs::read_to_string(&opts.output_taxa_file).unwrap();
        assert!(taxa.starts_with("HG799543.1\tno_rank__root; cellular_root__cellular_organisms; "));
        assert!(taxa.ends_with("genus__Colletotrichum; species__Colletotrichum_coccodes\n"));
        assert!(!dir.path().join("seqs.fa").exists());
    }

    #[test]
    fn test_run_unknown_taxon() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path(), "9606");
        let err = run(&opts).unwrap_err();
        assert!(matches!(err, SubnxError::NotFound(ref taxid) if taxid == "9606"));
    }

    #[test]
    fn test_run_gzipped_inputs_and_custom_index() {
        let dir = tempfile::tempdir().unwrap();
        let taxdmp = dir.path().join("taxdmp");
        fs::create_dir(&taxdmp).unwrap();
        for name in ["names.dmp", "nodes.dmp"] {
            gzip(&Path::new(TAXDMP_DIR).join(name), &taxdmp.join(format!("{}.gz", name)));
        }
        let accessions = dir.path().join("nucl_gb.accession2taxid.gz");
        gzip(Path::new(ACCESSION_FILE), &accessions);

        let mut opts = options(dir.path(), "5462");
        opts.taxdmp_dir = taxdmp;
        opts.accession2taxid_files = vec![accessions];
        opts.index_file = Some(dir.path().join("cache.idx"));
        opts.validate().unwrap();

        let summary = run(&opts).unwrap();
        assert_eq!(summary.accessions, 2);
        assert_eq!(summary.records, 1);
        assert!(dir.path().join("cache.idx").exists());
        assert!(!dir.path().join("nt.fai").exists());
        assert_eq!(
            fs::read_to_string(&opts.output_taxa_file).unwrap(),
            format!("ON631770.1\t{}\n", LAGENARIA_LINEAGE)
        );

        opts.rebuild_index = true;
        assert!(run(&opts).unwrap().index_built);
    }

    fn gzip(from: &Path, to: &Path) {
        let mut encoder = GzEncoder::new(File::create(to).unwrap(), Compression::default());
        encoder.write_all(&fs::read(from).unwrap()).unwrap();
        encoder.finish().unwrap();
    }
}
