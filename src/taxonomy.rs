use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use crate::errors::{Result, SubnxError};
use crate::names::NameStore;
use crate::utilities::{open_text, split_dump_line};

/// Taxon ID of the NCBI root. Always parentless, whatever its dump line says.
pub const ROOT_TAXID: &str = "1";

/// Ranks kept in a principal-only lineage, abbreviated to their first letter.
pub const PRINCIPAL_RANKS: [&str; 7] = [
    "kingdom", "phylum", "class", "order", "family", "genus", "species",
];

const RANK_DELIMITER: &str = "__";
const LINEAGE_SEPARATOR: &str = "; ";
const NODES_FIELD_COUNT: usize = 13;

/// Exact, case-sensitive membership in [`PRINCIPAL_RANKS`].
pub fn is_principal_rank(rank: &str) -> bool {
    PRINCIPAL_RANKS.contains(&rank)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonNode {
    pub taxid: String,
    pub name: String,
    /// Empty while the node is a placeholder created from a child's line
    pub rank: String,
    /// Position of the parent in the owning tree
    pub parent: Option<usize>,
    /// Positions of the children, in dump order
    pub children: Vec<usize>,
}

impl TaxonNode {
    pub fn new(taxid: &str, name: &str) -> Self {
        TaxonNode {
            taxid: taxid.to_string(),
            name: name.to_string(),
            rank: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_principal(&self) -> bool {
        is_principal_rank(&self.rank)
    }

    /// Renders `<rank>__<name>` with spaces replaced by underscores.
    ///
    /// # Arguments
    ///
    /// * `abbreviate` - Use the first letter of the rank for principal ranks.
    ///   Other ranks are always written in full.
    pub fn format(&self, abbreviate: bool) -> String {
        let token = match self.rank.chars().next() {
            Some(initial) if abbreviate && self.is_principal() => initial.to_string(),
            _ => self.rank.clone(),
        };
        format!("{}{}{}", token, RANK_DELIMITER, self.name).replace(' ', "_")
    }
}

/// The taxonomy as an arena of nodes addressed by position, with an index
/// from taxon ID to position. Parent and child links are positions into the
/// same arena, so dropping the tree releases every node at once.
#[derive(Debug, Default)]
pub struct TaxonomyTree {
    nodes: Vec<TaxonNode>,
    index: HashMap<String, usize>,
}

impl TaxonomyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the tree from a nodes dump.
    ///
    /// # Arguments
    ///
    /// * `filename` - The path to `nodes.dmp` (plain or `.gz`).
    /// * `names` - A fully loaded name store.
    pub fn from_file<P: AsRef<Path>>(filename: P, names: &NameStore) -> Result<Self> {
        Self::from_reader(open_text(filename.as_ref())?, names)
    }

    /// Lines that do not split into exactly 13 fields are skipped.
    pub fn from_reader<R: BufRead>(reader: R, names: &NameStore) -> Result<Self> {
        let mut tree = TaxonomyTree::new();
        for line in reader.lines() {
            let line = line?;
            let fields = split_dump_line(&line);
            if fields.len() != NODES_FIELD_COUNT {
                continue;
            }
            tree.insert(fields[0], fields[1], fields[2], names)?;
        }
        Ok(tree)
    }

    /// Defines one taxon from its dump line and links it under its parent.
    ///
    /// A parent that has not been defined yet is created as a placeholder
    /// (name only); its own line later fills in the rest. A taxon that already
    /// exists as a placeholder is updated in place.
    ///
    /// Each call appends one child link, so the same taxon must not be
    /// defined twice.
    ///
    /// # Returns
    ///
    /// The position of the defined node.
    pub fn insert(
        &mut self,
        taxid: &str,
        parent_taxid: &str,
        rank: &str,
        names: &NameStore,
    ) -> Result<usize> {
        let parent = if taxid == ROOT_TAXID {
            None
        } else {
            Some(self.get_or_create(parent_taxid, names)?)
        };
        let position = self.get_or_create(taxid, names)?;

        let node = &mut self.nodes[position];
        node.parent = parent;
        node.rank = rank.to_string();

        if let Some(parent) = parent {
            self.nodes[parent].children.push(position);
        }
        Ok(position)
    }

    fn get_or_create(&mut self, taxid: &str, names: &NameStore) -> Result<usize> {
        if let Some(&position) = self.index.get(taxid) {
            return Ok(position);
        }
        let name = names
            .get(taxid)
            .ok_or_else(|| SubnxError::MissingName(taxid.to_string()))?;
        let position = self.nodes.len();
        self.nodes.push(TaxonNode::new(taxid, name));
        self.index.insert(taxid.to_string(), position);
        Ok(position)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, taxid: &str) -> Option<&TaxonNode> {
        self.index.get(taxid).map(|&position| &self.nodes[position])
    }

    /// Position of a taxon, or [`SubnxError::NotFound`].
    pub fn position(&self, taxid: &str) -> Result<usize> {
        self.index
            .get(taxid)
            .copied()
            .ok_or_else(|| SubnxError::NotFound(taxid.to_string()))
    }

    /// Node at a position handed out by this tree.
    pub fn node(&self, position: usize) -> &TaxonNode {
        &self.nodes[position]
    }

    pub fn root(&self) -> Option<&TaxonNode> {
        self.get(ROOT_TAXID)
    }

    pub fn parent(&self, position: usize) -> Option<&TaxonNode> {
        self.nodes[position].parent.map(|parent| &self.nodes[parent])
    }

    pub fn children(&self, position: usize) -> impl Iterator<Item = &TaxonNode> + '_ {
        self.nodes[position]
            .children
            .iter()
            .map(move |&child| &self.nodes[child])
    }

    /// Walks parent links: `[self, parent, grandparent, ..., root]`.
    pub fn trace(&self, position: usize) -> Vec<&TaxonNode> {
        let mut ancestors = vec![&self.nodes[position]];
        let mut current = position;
        while let Some(parent) = self.nodes[current].parent {
            // a chain longer than the tree itself means the dump has a cycle
            if ancestors.len() > self.nodes.len() {
                break;
            }
            ancestors.push(&self.nodes[parent]);
            current = parent;
        }
        ancestors
    }

    /// Number of parent links between a node and its root.
    pub fn depth(&self, position: usize) -> usize {
        self.trace(position).len() - 1
    }

    /// Pre-order depth-first listing of a node and all of its descendants,
    /// children visited in dump order. Each node is listed at most once, so a
    /// cycle in the dump cannot loop forever.
    pub fn expand(&self, position: usize) -> Vec<&TaxonNode> {
        let mut descendants = Vec::new();
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![position];
        while let Some(current) = stack.pop() {
            if std::mem::replace(&mut visited[current], true) {
                continue;
            }
            let node = &self.nodes[current];
            descendants.push(node);
            stack.extend(node.children.iter().rev());
        }
        descendants
    }

    /// Taxon IDs of a taxon and all of its descendants.
    pub fn descendant_taxids(&self, taxid: &str) -> Result<HashSet<String>> {
        let position = self.position(taxid)?;
        Ok(self
            .expand(position)
            .into_iter()
            .map(|node| node.taxid.clone())
            .collect())
    }

    /// Root-to-node lineage joined with `"; "`.
    ///
    /// # Arguments
    ///
    /// * `position` - The node to describe.
    /// * `principal_only` - Keep only principal ranks, abbreviated.
    pub fn lineage(&self, position: usize, principal_only: bool) -> String {
        let mut parts: Vec<String> = self
            .trace(position)
            .into_iter()
            .filter(|node| !principal_only || node.is_principal())
            .map(|node| node.format(principal_only))
            .collect();
        parts.reverse();
        parts.join(LINEAGE_SEPARATOR)
    }
}
