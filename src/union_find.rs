//! Union-Find (Disjoint Set Union) data structure.
//!
//! Used to merge equivalent candidate sub-paths of a divergent region into
//! one group. Backed by ordered maps so group enumeration is deterministic:
//! the engine must return identical output for identical input.

use std::collections::BTreeMap;

/// Union-Find data structure with path compression and union by rank.
///
/// # Example
/// ```
/// use pre_annotation::union_find::UnionFind;
///
/// let mut uf = UnionFind::new();
/// uf.make_set("a");
/// uf.make_set("b");
/// uf.make_set("c");
///
/// uf.union(&"a", &"b");
/// assert_eq!(uf.find(&"a"), uf.find(&"b"));
/// assert_ne!(uf.find(&"a"), uf.find(&"c"));
/// ```
#[derive(Debug, Clone)]
pub struct UnionFind<T: Ord + Clone> {
    parent: BTreeMap<T, T>,
    rank: BTreeMap<T, usize>,
}

impl<T: Ord + Clone> Default for UnionFind<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> UnionFind<T> {
    /// Create a new empty Union-Find structure.
    pub fn new() -> Self {
        Self {
            parent: BTreeMap::new(),
            rank: BTreeMap::new(),
        }
    }

    /// Create a Union-Find where every item starts in its own set.
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut uf = Self::new();
        for item in items {
            uf.make_set(item);
        }
        uf
    }

    /// Add a new element as its own set.
    pub fn make_set(&mut self, item: T) {
        if !self.parent.contains_key(&item) {
            self.parent.insert(item.clone(), item.clone());
            self.rank.insert(item, 0);
        }
    }

    /// Find the representative (root) of the set containing `item`.
    ///
    /// Returns the item itself if not in the structure (auto-creates set).
    pub fn find(&mut self, item: &T) -> T {
        let current = match self.parent.get(item) {
            Some(parent) => parent.clone(),
            None => {
                self.make_set(item.clone());
                return item.clone();
            }
        };
        if &current == item {
            return current;
        }

        let root = self.find(&current);
        self.parent.insert(item.clone(), root.clone());
        root
    }

    /// Union the sets containing `a` and `b`.
    ///
    /// Returns true if the sets were different (union performed),
    /// false if they were already in the same set.
    pub fn union(&mut self, a: &T, b: &T) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);

        if root_a == root_b {
            return false;
        }

        let rank_a = self.rank.get(&root_a).copied().unwrap_or(0);
        let rank_b = self.rank.get(&root_b).copied().unwrap_or(0);

        if rank_a < rank_b {
            self.parent.insert(root_a, root_b);
        } else if rank_a > rank_b {
            self.parent.insert(root_b, root_a);
        } else {
            self.parent.insert(root_b, root_a.clone());
            self.rank.insert(root_a, rank_a + 1);
        }

        true
    }

    /// Check if two elements are in the same set.
    pub fn connected(&mut self, a: &T, b: &T) -> bool {
        self.find(a) == self.find(b)
    }

    /// Get all groups, each sorted ascending, ordered by their smallest member.
    ///
    /// Root identity depends on union order, so groups are keyed by their
    /// minimum element instead of their root.
    pub fn groups(&mut self) -> Vec<Vec<T>> {
        let items: Vec<T> = self.parent.keys().cloned().collect();
        let mut by_root: BTreeMap<T, Vec<T>> = BTreeMap::new();

        // `items` is ascending, so each member list comes out sorted and its
        // first element is the group minimum.
        for item in items {
            let root = self.find(&item);
            by_root.entry(root).or_default().push(item);
        }

        let mut groups: Vec<Vec<T>> = by_root.into_values().collect();
        groups.sort_by(|a, b| a[0].cmp(&b[0]));
        groups
    }

    /// Get the number of elements in the structure.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Check if the structure is empty.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}
