//! Octree spatial partitioning structure
//!
//! Divides a bounded 3D region into hierarchical octants for fast
//! broad-phase collision queries. A node holds candidate boxes locally until
//! it overflows `max_objects`, then splits into 8 children and pushes down
//! every box that fits entirely inside a single octant. Boxes straddling a
//! split plane stay at the parent level.
//!
//! The index trades precision for stability: node origins and split offsets
//! are rounded to whole units, so fractional jitter in body positions does
//! not reshuffle the tree. `retrieve` may return duplicates and false
//! positives but never false negatives; callers must still run the exact
//! geometric test.

use crate::geom::Box3;
use crate::physics::Body;

/// A candidate box stored in the octree.
///
/// `id` is caller-defined; [`Octree::populate`] uses the body's index within
/// the supplied slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeEntry {
    /// Caller-defined identifier for the box
    pub id: usize,
    /// The box itself, snapshotted at insertion time
    pub bounds: Box3,
}

/// A node's region with its precomputed split planes.
#[derive(Debug, Clone, Copy, Default)]
struct Region {
    x: f32,
    y: f32,
    z: f32,
    width_x: f32,
    width_y: f32,
    height: f32,
    sub_width_x: f32,
    sub_width_y: f32,
    sub_height: f32,
    front_x: f32,
    front_y: f32,
    top: f32,
}

/// Recursive octree over a fixed region.
///
/// The root doubles as every interior node: construct it once with the world
/// region and reuse its allocation across frames via [`Octree::reset`].
#[derive(Debug, Clone)]
pub struct Octree {
    /// Maximum number of entries per node before subdivision
    max_objects: usize,
    /// Maximum subdivision depth
    max_levels: u32,
    /// Depth of this node (0 = root)
    level: u32,
    /// Region covered by this node
    region: Region,
    /// Entries held at this level (straddlers and not-yet-pushed-down boxes)
    entries: Vec<OctreeEntry>,
    /// Child octants; a node has children iff it has split
    children: Option<Box<[Octree; 8]>>,
}

/// Default maximum entries per node.
pub const DEFAULT_MAX_OBJECTS: usize = 10;

/// Default maximum subdivision depth.
pub const DEFAULT_MAX_LEVELS: u32 = 4;

impl Octree {
    /// Create a new octree covering the given region.
    pub fn new(
        x: f32,
        y: f32,
        z: f32,
        width_x: f32,
        width_y: f32,
        height: f32,
        max_objects: usize,
        max_levels: u32,
    ) -> Self {
        let mut tree = Self {
            max_objects: DEFAULT_MAX_OBJECTS,
            max_levels: DEFAULT_MAX_LEVELS,
            level: 0,
            region: Region::default(),
            entries: Vec::new(),
            children: None,
        };
        tree.reset(x, y, z, width_x, width_y, height, max_objects, max_levels, 0);
        tree
    }

    /// Reinitialize the node: new region, recomputed split planes, empty
    /// entry list, no children. Used both at construction and to recycle the
    /// root's allocation between frames.
    ///
    /// The origin is rounded and the split offsets floored, so the planes sit
    /// on whole units regardless of fractional world bounds.
    pub fn reset(
        &mut self,
        x: f32,
        y: f32,
        z: f32,
        width_x: f32,
        width_y: f32,
        height: f32,
        max_objects: usize,
        max_levels: u32,
        level: u32,
    ) {
        let x = x.round();
        let y = y.round();
        let z = z.round();
        let sub_width_x = (width_x * 0.5).floor();
        let sub_width_y = (width_y * 0.5).floor();
        let sub_height = (height * 0.5).floor();

        self.max_objects = max_objects;
        self.max_levels = max_levels;
        self.level = level;
        self.region = Region {
            x,
            y,
            z,
            width_x,
            width_y,
            height,
            sub_width_x,
            sub_width_y,
            sub_height,
            front_x: x + sub_width_x,
            front_y: y + sub_width_y,
            top: z + sub_height,
        };
        self.entries.clear();
        self.children = None;
    }

    /// Insert the box of every body in the slice whose `exists` flag is set,
    /// using the slice index as the entry id. Dead bodies are silently
    /// skipped.
    pub fn populate(&mut self, bodies: &[Body]) {
        for (id, body) in bodies.iter().enumerate() {
            if body.exists {
                self.insert(OctreeEntry {
                    id,
                    bounds: body.bounds(),
                });
            }
        }
    }

    /// Insert an entry.
    ///
    /// Descends into the single fitting child when this node has already
    /// split; otherwise the entry is held locally. When the local list
    /// overflows `max_objects` below the level cap, the node splits and makes
    /// one redistribution pass over its list — entries that straddle a split
    /// plane remain here.
    pub fn insert(&mut self, entry: OctreeEntry) {
        if self.children.is_some() {
            if let Some(index) = self.get_index(&entry.bounds) {
                if let Some(children) = self.children.as_mut() {
                    children[index].insert(entry);
                }
                return;
            }
        }

        self.entries.push(entry);

        if self.entries.len() > self.max_objects && self.level < self.max_levels {
            if self.children.is_none() {
                self.split();
            }

            // One pass only: whatever still straddles stays at this level.
            let mut i = 0;
            while i < self.entries.len() {
                if let Some(index) = self.get_index(&self.entries[i].bounds) {
                    let moved = self.entries.remove(i);
                    if let Some(children) = self.children.as_mut() {
                        children[index].insert(moved);
                    }
                } else {
                    i += 1;
                }
            }
        }
    }

    /// Which child octant fully contains the box, or `None` if the box
    /// straddles a split plane on any axis and must stay at this level.
    ///
    /// Octant numbering is a bit pattern over the three axes:
    /// x beyond the plane adds 1, y adds 2, z adds 4 — so `-x-y-z` is 0 and
    /// `+x+y+z` is 7.
    pub fn get_index(&self, cube: &Box3) -> Option<usize> {
        let r = &self.region;

        let ix = if cube.x < r.front_x && cube.front_x() < r.front_x {
            0
        } else if cube.x > r.front_x {
            1
        } else {
            return None;
        };

        let iy = if cube.y < r.front_y && cube.front_y() < r.front_y {
            0
        } else if cube.y > r.front_y {
            2
        } else {
            return None;
        };

        let iz = if cube.z < r.top && cube.top() < r.top {
            0
        } else if cube.z > r.top {
            4
        } else {
            return None;
        };

        Some(ix + iy + iz)
    }

    /// Split the node into 8 child octants at `level + 1`, each covering half
    /// the parent extent on the corresponding side of the split planes.
    fn split(&mut self) {
        if self.children.is_some() {
            return;
        }

        let r = self.region;

        self.children = Some(Box::new([
            // bottom four octants
            self.subnode(r.x, r.y, r.z),             // -x-y-z
            self.subnode(r.front_x, r.y, r.z),       // +x-y-z
            self.subnode(r.x, r.front_y, r.z),       // -x+y-z
            self.subnode(r.front_x, r.front_y, r.z), // +x+y-z
            // top four octants
            self.subnode(r.x, r.y, r.top),             // -x-y+z
            self.subnode(r.front_x, r.y, r.top),       // +x-y+z
            self.subnode(r.x, r.front_y, r.top),       // -x+y+z
            self.subnode(r.front_x, r.front_y, r.top), // +x+y+z
        ]));
    }

    /// Build one child octant rooted at the given corner.
    fn subnode(&self, x: f32, y: f32, z: f32) -> Self {
        let r = &self.region;
        Self::child(
            x,
            y,
            z,
            r.sub_width_x,
            r.sub_width_y,
            r.sub_height,
            self.max_objects,
            self.max_levels,
            self.level + 1,
        )
    }

    fn child(
        x: f32,
        y: f32,
        z: f32,
        width_x: f32,
        width_y: f32,
        height: f32,
        max_objects: usize,
        max_levels: u32,
        level: u32,
    ) -> Self {
        let mut node = Self {
            max_objects,
            max_levels,
            level,
            region: Region::default(),
            entries: Vec::new(),
            children: None,
        };
        node.reset(
            x,
            y,
            z,
            width_x,
            width_y,
            height,
            max_objects,
            max_levels,
            level,
        );
        node
    }

    /// Return every stored box that could overlap the query box.
    ///
    /// Collects the local list of each node along the query's descent path.
    /// A query that straddles a split plane is checked against all 8 children
    /// because it might overlap any of them. The result may contain
    /// duplicates and false positives; it never omits a true intersection.
    pub fn retrieve(&self, query: &Box3) -> Vec<OctreeEntry> {
        let mut results = Vec::new();
        self.retrieve_into(query, &mut results);
        results
    }

    fn retrieve_into(&self, query: &Box3, results: &mut Vec<OctreeEntry>) {
        results.extend_from_slice(&self.entries);

        if let Some(children) = self.children.as_ref() {
            if let Some(index) = self.get_index(query) {
                children[index].retrieve_into(query, results);
            } else {
                for child in children.iter() {
                    child.retrieve_into(query, results);
                }
            }
        }
    }

    /// Remove all entries and discard all child nodes.
    pub fn clear(&mut self) {
        self.entries.clear();

        if let Some(mut children) = self.children.take() {
            for child in children.iter_mut() {
                child.clear();
            }
        }
    }

    /// Total number of entries in this node and all descendants.
    pub fn len(&self) -> usize {
        let mut count = self.entries.len();

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                count += child.len();
            }
        }

        count
    }

    /// Whether the tree holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn unit_box(x: f32, y: f32, z: f32) -> Box3 {
        Box3::new(x, y, z, 1.0, 1.0, 1.0)
    }

    #[test]
    fn test_basic_insertion() {
        let mut tree = Octree::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0, 10, 4);
        tree.insert(OctreeEntry {
            id: 0,
            bounds: unit_box(5.0, 5.0, 5.0),
        });
        assert_eq!(tree.len(), 1);
        assert!(tree.children.is_none());
    }

    #[test]
    fn test_split_and_redistribute() {
        // The end-to-end scenario: region 100^3, capacity 2. The third insert
        // forces a split; the two low boxes land together in octant 0 and the
        // high box in octant 7.
        let mut tree = Octree::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0, 2, 4);
        tree.insert(OctreeEntry {
            id: 0,
            bounds: unit_box(10.0, 10.0, 10.0),
        });
        tree.insert(OctreeEntry {
            id: 1,
            bounds: unit_box(20.0, 20.0, 20.0),
        });
        tree.insert(OctreeEntry {
            id: 2,
            bounds: unit_box(60.0, 60.0, 60.0),
        });

        let children = tree.children.as_ref().expect("root should have split");
        assert!(tree.entries.is_empty());

        let low_ids: Vec<usize> = children[0].entries.iter().map(|e| e.id).collect();
        assert_eq!(low_ids, vec![0, 1]);

        let high_ids: Vec<usize> = children[7].entries.iter().map(|e| e.id).collect();
        assert_eq!(high_ids, vec![2]);

        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_get_index_octants() {
        let tree = Octree::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0, 10, 4);
        // Split planes sit at 50 on every axis.
        assert_eq!(tree.get_index(&unit_box(10.0, 10.0, 10.0)), Some(0));
        assert_eq!(tree.get_index(&unit_box(60.0, 10.0, 10.0)), Some(1));
        assert_eq!(tree.get_index(&unit_box(10.0, 60.0, 10.0)), Some(2));
        assert_eq!(tree.get_index(&unit_box(60.0, 60.0, 10.0)), Some(3));
        assert_eq!(tree.get_index(&unit_box(10.0, 10.0, 60.0)), Some(4));
        assert_eq!(tree.get_index(&unit_box(60.0, 10.0, 60.0)), Some(5));
        assert_eq!(tree.get_index(&unit_box(10.0, 60.0, 60.0)), Some(6));
        assert_eq!(tree.get_index(&unit_box(60.0, 60.0, 60.0)), Some(7));
    }

    #[test]
    fn test_get_index_straddlers_stay_at_parent() {
        let tree = Octree::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0, 10, 4);
        // Spans the x plane
        assert_eq!(
            tree.get_index(&Box3::new(45.0, 10.0, 10.0, 10.0, 1.0, 1.0)),
            None
        );
        // Touches the plane exactly: strict comparisons keep it at the parent
        assert_eq!(
            tree.get_index(&Box3::new(50.0, 10.0, 10.0, 1.0, 1.0, 1.0)),
            None
        );
        // Spans the z plane
        assert_eq!(
            tree.get_index(&Box3::new(10.0, 10.0, 45.0, 1.0, 1.0, 10.0)),
            None
        );
    }

    #[test]
    fn test_level_cap_accumulates_without_splitting() {
        let mut tree = Octree::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0, 2, 0);
        for i in 0..50 {
            tree.insert(OctreeEntry {
                id: i,
                bounds: unit_box(10.0, 10.0, 10.0),
            });
        }
        assert!(tree.children.is_none());
        assert_eq!(tree.entries.len(), 50);
        // Retrieval degrades to a linear scan but stays correct.
        assert_eq!(tree.retrieve(&unit_box(10.0, 10.0, 10.0)).len(), 50);
    }

    #[test]
    fn test_clear_discards_children() {
        let mut tree = Octree::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0, 1, 4);
        tree.insert(OctreeEntry {
            id: 0,
            bounds: unit_box(10.0, 10.0, 10.0),
        });
        tree.insert(OctreeEntry {
            id: 1,
            bounds: unit_box(80.0, 80.0, 80.0),
        });
        assert!(tree.children.is_some());

        tree.clear();
        assert!(tree.children.is_none());
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn test_retrieve_has_no_false_negatives() {
        // Property check against a brute-force scan: everything that truly
        // intersects the query must appear in the retrieved candidate set,
        // including boxes straddling split planes.
        let mut rng = StdRng::seed_from_u64(0x0c7ee);

        for _ in 0..40 {
            let mut tree = Octree::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0, 4, 4);
            let mut boxes = Vec::new();

            for id in 0..60 {
                let b = Box3::new(
                    rng.gen_range(0.0..90.0),
                    rng.gen_range(0.0..90.0),
                    rng.gen_range(0.0..90.0),
                    rng.gen_range(0.5..20.0),
                    rng.gen_range(0.5..20.0),
                    rng.gen_range(0.5..20.0),
                );
                tree.insert(OctreeEntry { id, bounds: b });
                boxes.push(b);
            }

            for _ in 0..10 {
                let query = Box3::new(
                    rng.gen_range(0.0..90.0),
                    rng.gen_range(0.0..90.0),
                    rng.gen_range(0.0..90.0),
                    rng.gen_range(0.5..25.0),
                    rng.gen_range(0.5..25.0),
                    rng.gen_range(0.5..25.0),
                );

                let candidates: Vec<usize> =
                    tree.retrieve(&query).iter().map(|e| e.id).collect();

                for (id, b) in boxes.iter().enumerate() {
                    if query.intersects(b) {
                        assert!(
                            candidates.contains(&id),
                            "box {id} intersects the query but was not retrieved"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_reset_recycles_the_root() {
        let mut tree = Octree::new(0.0, 0.0, 0.0, 100.0, 100.0, 100.0, 1, 4);
        tree.insert(OctreeEntry {
            id: 0,
            bounds: unit_box(10.0, 10.0, 10.0),
        });
        tree.insert(OctreeEntry {
            id: 1,
            bounds: unit_box(80.0, 80.0, 80.0),
        });

        tree.reset(0.0, 0.0, 0.0, 200.0, 200.0, 200.0, 10, 4, 0);
        assert!(tree.is_empty());
        assert!(tree.children.is_none());
        // New split planes at 100
        assert_eq!(tree.get_index(&unit_box(120.0, 120.0, 120.0)), Some(7));
    }

    #[test]
    fn test_rounding_of_region_origin() {
        let tree = Octree::new(0.4, 0.6, -0.4, 101.0, 101.0, 101.0, 10, 4);
        // Origin rounds to (0, 1, 0); sub extents floor to 50.
        assert_eq!(tree.region.front_x, 50.0);
        assert_eq!(tree.region.front_y, 51.0);
        assert_eq!(tree.region.top, 50.0);
    }
}
