//! Bounded breadth-first expansion of composition relations.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;
use tracing::debug;

use super::executor::QueryExecutor;
use super::specification::CatalogRecordSpecification;
use crate::error::Error;
use crate::model::{CatalogRecord, SimpleRelationType};
use crate::storage::CatalogStore;

/// Default expansion depth.
pub const DEFAULT_HIERARCHY_DEPTH: usize = 10;

/// Relations followed when none are given.
pub const DEFAULT_COMPOSITION_RELATIONS: [SimpleRelationType; 5] = [
    SimpleRelationType::Properties,
    SimpleRelationType::PossibleValues,
    SimpleRelationType::Values,
    SimpleRelationType::Subdivisions,
    SimpleRelationType::Units,
];

/// Roots to expand and how far.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyQuery {
    /// Filters selecting the roots. Pagination is ignored.
    pub root: CatalogRecordSpecification,
    /// Levels below the roots to expand. 0 returns the roots only.
    pub max_depth: usize,
    /// Outgoing relations treated as composition.
    pub relations: Vec<SimpleRelationType>,
}

impl HierarchyQuery {
    /// Expand the records matching `root` with the default depth and relations.
    pub fn new(root: CatalogRecordSpecification) -> Self {
        Self {
            root,
            max_depth: DEFAULT_HIERARCHY_DEPTH,
            relations: DEFAULT_COMPOSITION_RELATIONS.to_vec(),
        }
    }

    /// Set the expansion depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Replace the followed relations.
    pub fn with_relations(mut self, relations: impl IntoIterator<Item = SimpleRelationType>) -> Self {
        self.relations = relations.into_iter().collect();
        self
    }
}

/// A record in the hierarchy arena.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub record: CatalogRecord,
    /// Distance from the root that first reached the node.
    pub depth: usize,
}

/// A composition link between two arena nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HierarchyEdge {
    pub parent: usize,
    pub child: usize,
    pub relation: SimpleRelationType,
}

/// Result of a hierarchy expansion.
///
/// Every record appears once in `nodes`. `edges` link arena indices along the
/// breadth-first discovery, so they form a forest rooted at `roots`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HierarchyTree {
    pub nodes: Vec<HierarchyNode>,
    pub edges: Vec<HierarchyEdge>,
    pub roots: Vec<usize>,
    /// Record ids along every root-to-leaf path.
    pub paths: Vec<Vec<String>>,
    /// Node index -> indices into `edges` leaving it.
    #[serde(skip)]
    adjacency: Vec<Vec<usize>>,
}

impl HierarchyTree {
    /// Arena index of a record.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.record.id == id)
    }

    /// Edges leaving a node, in discovery order.
    pub fn child_edges(&self, parent: usize) -> impl Iterator<Item = &HierarchyEdge> + '_ {
        self.adjacency
            .get(parent)
            .into_iter()
            .flatten()
            .map(move |edge| &self.edges[*edge])
    }

    /// Arena indices of a node's children, in discovery order.
    pub fn children(&self, parent: usize) -> impl Iterator<Item = usize> + '_ {
        self.child_edges(parent).map(|edge| edge.child)
    }

    fn push_node(&mut self, record: CatalogRecord, depth: usize) -> usize {
        self.nodes.push(HierarchyNode { record, depth });
        self.adjacency.push(Vec::new());
        self.nodes.len() - 1
    }

    fn push_edge(&mut self, parent: usize, child: usize, relation: SimpleRelationType) {
        self.adjacency[parent].push(self.edges.len());
        self.edges.push(HierarchyEdge {
            parent,
            child,
            relation,
        });
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no root matched.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn collect_paths(&mut self) {
        let mut paths = Vec::new();
        let mut stack: Vec<(usize, Vec<String>)> = self
            .roots
            .iter()
            .rev()
            .map(|root| (*root, vec![self.nodes[*root].record.id.clone()]))
            .collect();

        while let Some((index, path)) = stack.pop() {
            let children: Vec<usize> = self.children(index).collect();
            if children.is_empty() {
                paths.push(path);
                continue;
            }
            for child in children.into_iter().rev() {
                let mut next = path.clone();
                next.push(self.nodes[child].record.id.clone());
                stack.push((child, next));
            }
        }
        self.paths = paths;
    }
}

/// Expands hierarchies over a store.
pub struct HierarchyBuilder<'a> {
    store: &'a CatalogStore,
}

impl<'a> HierarchyBuilder<'a> {
    /// Create a builder over a store.
    pub fn new(store: &'a CatalogStore) -> Self {
        Self { store }
    }

    /// Find the roots and expand them breadth-first.
    ///
    /// A record reached more than once is kept at its first position and
    /// never expanded again, so cycles terminate.
    pub fn build(&self, query: &HierarchyQuery) -> Result<HierarchyTree, Error> {
        let roots = QueryExecutor::new(self.store).find_all_unpaged(&query.root)?;

        let mut tree = HierarchyTree::default();
        let mut visited: HashMap<String, usize> = HashMap::new();
        let mut queue = VecDeque::new();

        for record in roots {
            let id = record.id.clone();
            let index = tree.push_node(record, 0);
            visited.insert(id, index);
            tree.roots.push(index);
            queue.push_back(index);
        }

        while let Some(parent) = queue.pop_front() {
            let depth = tree.nodes[parent].depth;
            if depth >= query.max_depth {
                continue;
            }
            let parent_id = tree.nodes[parent].record.id.clone();

            for relation in &query.relations {
                let child_ids = self.store.outgoing(&parent_id, *relation)?;
                for child in self.store.get_records(&child_ids)? {
                    if visited.contains_key(&child.id) {
                        continue;
                    }
                    let id = child.id.clone();
                    let index = tree.push_node(child, depth + 1);
                    visited.insert(id, index);
                    tree.push_edge(parent, index, *relation);
                    queue.push_back(index);
                }
            }
        }

        tree.collect_paths();
        debug!(
            roots = tree.roots.len(),
            nodes = tree.nodes.len(),
            max_depth = query.max_depth,
            "Hierarchy expanded"
        );
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordKind;
    use crate::storage::StorageConfig;

    fn store_with(records: &[(&str, RecordKind)]) -> (CatalogStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::open(StorageConfig::new(dir.path())).unwrap();
        for (id, kind) in records {
            store.insert_record(&CatalogRecord::new(*id, *kind)).unwrap();
        }
        (store, dir)
    }

    #[test]
    fn test_expands_composition() {
        let (store, _dir) = store_with(&[
            ("wall", RecordKind::Subject),
            ("height", RecordKind::Property),
            ("width", RecordKind::Property),
            ("mm", RecordKind::Unit),
        ]);
        store
            .replace_edges("wall", SimpleRelationType::Properties, &["height", "width"])
            .unwrap();
        store.add_edge("height", SimpleRelationType::Units, "mm").unwrap();

        let query = HierarchyQuery::new(
            CatalogRecordSpecification::new().with_kind_in([RecordKind::Subject]),
        );
        let tree = HierarchyBuilder::new(&store).build(&query).unwrap();

        assert_eq!(tree.roots, vec![0]);
        assert_eq!(tree.len(), 4);
        assert_eq!(
            tree.paths,
            vec![
                vec!["wall".to_string(), "height".into(), "mm".into()],
                vec!["wall".to_string(), "width".into()],
            ]
        );
        let mm = tree.index_of("mm").unwrap();
        assert_eq!(tree.nodes[mm].depth, 2);
    }

    #[test]
    fn test_child_edges_follow_adjacency() {
        let mut records = vec![("root", RecordKind::Subject)];
        let props: Vec<String> = (0..6).map(|i| format!("p-{}", i)).collect();
        for id in &props {
            records.push((id.as_str(), RecordKind::Property));
        }
        records.push(("mm", RecordKind::Unit));
        let (store, _dir) = store_with(&records);
        store
            .replace_edges("root", SimpleRelationType::Properties, props.as_slice())
            .unwrap();
        store.add_edge("p-3", SimpleRelationType::Units, "mm").unwrap();

        let query = HierarchyQuery::new(CatalogRecordSpecification::new().with_id_in(["root"]));
        let tree = HierarchyBuilder::new(&store).build(&query).unwrap();

        let root = tree.index_of("root").unwrap();
        let children: Vec<&str> = tree
            .children(root)
            .map(|i| tree.nodes[i].record.id.as_str())
            .collect();
        assert_eq!(children, vec!["p-0", "p-1", "p-2", "p-3", "p-4", "p-5"]);

        let p3 = tree.index_of("p-3").unwrap();
        let edges: Vec<_> = tree.child_edges(p3).collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relation, SimpleRelationType::Units);
        assert_eq!(tree.nodes[edges[0].child].record.id, "mm");
        assert_eq!(tree.children(tree.index_of("mm").unwrap()).count(), 0);
        assert_eq!(tree.paths.len(), 6);
        assert_eq!(tree.children(usize::MAX).count(), 0);
    }

    #[test]
    fn test_cycle_terminates() {
        let (store, _dir) = store_with(&[
            ("a", RecordKind::Subject),
            ("b", RecordKind::Subject),
        ]);
        store.add_edge("a", SimpleRelationType::Properties, "b").unwrap();
        store.add_edge("b", SimpleRelationType::Properties, "a").unwrap();

        let query = HierarchyQuery::new(CatalogRecordSpecification::new().with_id_in(["a"]))
            .with_max_depth(3);
        let tree = HierarchyBuilder::new(&store).build(&query).unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.paths, vec![vec!["a".to_string(), "b".into()]]);
    }

    #[test]
    fn test_depth_zero_returns_roots() {
        let (store, _dir) = store_with(&[
            ("a", RecordKind::Subject),
            ("b", RecordKind::Property),
        ]);
        store.add_edge("a", SimpleRelationType::Properties, "b").unwrap();

        let query = HierarchyQuery::new(CatalogRecordSpecification::new().with_id_in(["a"]))
            .with_max_depth(0);
        let tree = HierarchyBuilder::new(&store).build(&query).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.edges.is_empty());
        assert_eq!(tree.paths, vec![vec!["a".to_string()]]);
    }

    #[test]
    fn test_root_pagination_ignored() {
        let (store, _dir) = store_with(&[
            ("a", RecordKind::Subject),
            ("b", RecordKind::Subject),
            ("c", RecordKind::Subject),
        ]);
        let query = HierarchyQuery::new(CatalogRecordSpecification::new().with_pagination(0, 1));
        let tree = HierarchyBuilder::new(&store).build(&query).unwrap();
        assert_eq!(tree.roots.len(), 3);
    }
}
