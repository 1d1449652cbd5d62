//! Quadtree of elements over a multipatch geometry.
//!
//! The root holds one son per patch; uniform refinement splits every leaf
//! into four congruent sub-squares of the parameter domain. Vertices are
//! global and deduplicated, so the topology stays watertight across patch
//! boundaries and refinement levels.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector, Vector2, Vector3};

use crate::geometry::Geometry;
use crate::util::constants::{POINT_COMPARISON_TOLERANCE, REFERENCE_CORNERS, SON_LLCS};

/// A single element of the tree, stored in the arena of [`ElementTree`].
///
/// Ids are level-local: the sons of element `id` carry ids `4 * id + k`.
/// The root and freshly inserted nodes carry the sentinel `-1` for id,
/// level and patch.
#[derive(Debug, Clone)]
pub struct ElementTreeNode {
    /// Lower left corner of the element on the unit square.
    pub llc: Vector2<f64>,
    /// Midpoint of the enclosing ball in world coordinates.
    pub midpoint: Vector3<f64>,
    /// Radius of the enclosing ball.
    pub radius: f64,
    /// Global ids of the four corner vertices, counterclockwise from `llc`.
    pub vertices: Vec<usize>,
    /// Arena indices of the four sons, empty for leaves.
    pub sons: Vec<usize>,
    /// Arena indices of the edge neighbours, `None` on the geometry boundary.
    pub adjacents: [Option<usize>; 4],
    pub id: i32,
    pub level: i32,
    pub patch: i32,
}

impl Default for ElementTreeNode {
    fn default() -> Self {
        Self {
            llc: Vector2::zeros(),
            midpoint: Vector3::zeros(),
            radius: f64::INFINITY,
            vertices: Vec::new(),
            sons: Vec::new(),
            adjacents: [None; 4],
            id: -1,
            level: -1,
            patch: -1,
        }
    }
}

impl ElementTreeNode {
    /// Side length of the element on the parameter square.
    pub fn h(&self) -> f64 {
        1.0 / f64::from(1 << self.level)
    }

    /// Maps a point of the unit square onto this element's local coordinates.
    pub fn map_to_reference_element(&self, point: &Vector2<f64>) -> Vector2<f64> {
        let out = (point - self.llc) / self.h();
        debug_assert!(out.x >= 0.0 && out.x <= 1.0 && out.y >= 0.0 && out.y <= 1.0);
        out
    }

    /// Midpoint of the element on the parameter square.
    pub fn reference_midpoint(&self) -> Vector2<f64> {
        self.llc + Vector2::new(0.5, 0.5) * self.h()
    }

    pub fn is_leaf(&self) -> bool {
        self.sons.is_empty()
    }
}

/// Interface between two patch-level elements, or a boundary edge.
///
/// `patches.1` and `edges.1` are `-1` when the edge lies on the geometry
/// boundary. Edges are numbered counterclockwise, starting at the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchInterface {
    pub patches: (i32, i32),
    pub edges: (i32, i32),
}

/// Arena-allocated element quadtree. Index 0 is the root.
#[derive(Debug)]
pub struct ElementTree {
    geometry: Geometry,
    nodes: Vec<ElementTreeNode>,
    leafs: Vec<usize>,
    number_of_patches: usize,
    number_of_points: usize,
    number_of_elements: usize,
    max_level: usize,
}

impl ElementTree {
    /// Builds the patch-level tree and refines it uniformly to
    /// `refinement_level`.
    pub fn new(geometry: &Geometry, refinement_level: usize) -> Self {
        let number_of_patches = geometry.number_of_patches();
        let mut tree = Self {
            geometry: geometry.clone(),
            nodes: vec![ElementTreeNode::default()],
            leafs: Vec::new(),
            number_of_patches,
            number_of_points: 0,
            number_of_elements: number_of_patches,
            max_level: 0,
        };
        let mut unique_points: Vec<Vector3<f64>> = Vec::new();
        let mut patch_nodes = Vec::with_capacity(number_of_patches);
        for (i, patch) in geometry.patches().iter().enumerate() {
            let mut node = ElementTreeNode {
                vertices: vec![0; 4],
                id: i as i32,
                level: 0,
                patch: i as i32,
                ..Default::default()
            };
            for j in 0..4 {
                let corner = Vector2::new(REFERENCE_CORNERS[0][j], REFERENCE_CORNERS[1][j]);
                let v = patch.eval(&corner);
                match unique_points
                    .iter()
                    .position(|p| (p - v).norm() < POINT_COMPARISON_TOLERANCE)
                {
                    Some(index) => node.vertices[j] = index,
                    None => {
                        unique_points.push(v);
                        node.vertices[j] = tree.number_of_points;
                        tree.number_of_points += 1;
                    }
                }
            }
            let index = tree.nodes.len();
            tree.nodes.push(node);
            patch_nodes.push(index);
        }
        tree.nodes[0].sons = patch_nodes.clone();
        tree.update_topology(&patch_nodes);
        for _ in 0..refinement_level {
            tree.refine_uniformly();
        }
        tree.leafs = tree.collect_leafs();
        tracing::debug!(
            patches = number_of_patches,
            level = tree.max_level,
            elements = tree.number_of_elements,
            points = tree.number_of_points,
            "Element tree built"
        );
        tree
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn number_of_points(&self) -> usize {
        self.number_of_points
    }

    pub fn number_of_elements(&self) -> usize {
        self.number_of_elements
    }

    pub fn number_of_patches(&self) -> usize {
        self.number_of_patches
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn node(&self, index: usize) -> &ElementTreeNode {
        &self.nodes[index]
    }

    pub fn root(&self) -> &ElementTreeNode {
        &self.nodes[0]
    }

    /// Leaf elements in id order; position k holds the element with id k.
    pub fn leafs(&self) -> impl Iterator<Item = &ElementTreeNode> {
        self.leafs.iter().map(move |&i| &self.nodes[i])
    }

    /// The leaf with level-local id `id`.
    pub fn leaf(&self, id: usize) -> &ElementTreeNode {
        &self.nodes[self.leafs[id]]
    }

    pub fn number_of_leafs(&self) -> usize {
        self.leafs.len()
    }

    /// Arena indices of all elements on the given level, in id order.
    pub fn level_indices(&self, level: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[0].sons.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.level == level as i32 {
                out.push(index);
            } else {
                stack.extend(node.sons.iter().rev().copied());
            }
        }
        out
    }

    /// Positions of the leaf descendants of `node` within the leaf list.
    pub fn cluster_leaf_range(&self, node: &ElementTreeNode) -> std::ops::Range<usize> {
        if node.level < 0 {
            return 0..self.leafs.len();
        }
        let span = 1usize << (2 * (self.max_level - node.level as usize));
        let first = node.id as usize * span;
        first..first + span
    }

    /// Splits every current leaf into four sons.
    pub fn refine_uniformly(&mut self) {
        for index in self.collect_leafs() {
            self.refine_leaf(index);
        }
        self.leafs = self.collect_leafs();
    }

    /// Evaluates all element corners on the surface, indexed by vertex id.
    pub fn generate_point_list(&self) -> DMatrix<f64> {
        let mut points = DMatrix::zeros(3, self.number_of_points);
        let patches = self.geometry.patches();
        for node in self.leafs() {
            let h = node.h();
            let patch = &patches[node.patch as usize];
            let corners = [
                node.llc,
                node.llc + Vector2::new(h, 0.0),
                node.llc + Vector2::new(h, h),
                node.llc + Vector2::new(0.0, h),
            ];
            for (j, corner) in corners.iter().enumerate() {
                points.set_column(node.vertices[j], &patch.eval(corner));
            }
        }
        points
    }

    /// Vertex ids of every leaf, counterclockwise.
    pub fn generate_element_list(&self) -> Vec<[usize; 4]> {
        self.leafs()
            .map(|node| [
                node.vertices[0],
                node.vertices[1],
                node.vertices[2],
                node.vertices[3],
            ])
            .collect()
    }

    /// Enclosing ball midpoints of every leaf.
    pub fn generate_midpoint_list(&self) -> DMatrix<f64> {
        let mut out = DMatrix::zeros(3, self.number_of_elements);
        for (i, node) in self.leafs().enumerate() {
            out.set_column(i, &node.midpoint);
        }
        out
    }

    /// Enclosing ball radii of every leaf.
    pub fn generate_radius_list(&self) -> DVector<f64> {
        DVector::from_iterator(self.number_of_elements, self.leafs().map(|node| node.radius))
    }

    /// Level-transcending ids of every leaf.
    pub fn generate_element_labels(&self) -> Vec<usize> {
        self.leafs().map(|node| self.global_id(node)).collect()
    }

    /// Per leaf: -1 on the geometry boundary, otherwise the number of edges
    /// shared with another patch.
    pub fn generate_patch_boundary_labels(&self) -> Vec<i32> {
        self.leafs()
            .map(|node| {
                let mut label = 0;
                for j in 0..4 {
                    match node.adjacents[j] {
                        None => return -1,
                        Some(n) if self.nodes[n].patch != node.patch => label += 1,
                        Some(_) => {}
                    }
                }
                label
            })
            .collect()
    }

    /// Flags the leaves belonging to the given patch.
    pub fn identify_patch(&self, patch: usize) -> Vec<bool> {
        self.leafs().map(|node| node.patch == patch as i32).collect()
    }

    /// Computes the enclosing balls of all elements bottom-up and returns
    /// the surface point list used for the leaf balls.
    pub fn compute_element_enclosings(&mut self) -> DMatrix<f64> {
        let points = self.generate_point_list();
        for index in self.nodes[0].sons.clone() {
            self.compute_enclosings_recursion(index, &points);
        }
        points
    }

    /// Interfaces of the patch-level elements, one entry per edge.
    pub fn patch_topology_info(&self) -> Vec<PatchInterface> {
        let mut out = Vec::new();
        for &index in &self.nodes[0].sons {
            let node = &self.nodes[index];
            for j in 0..4 {
                match node.adjacents[j] {
                    Some(n) => {
                        let neighbour = &self.nodes[n];
                        // visit every interface once
                        if node.id < neighbour.id {
                            let k = (0..4)
                                .find(|&k| neighbour.adjacents[k] == Some(index))
                                .unwrap_or(4);
                            out.push(PatchInterface {
                                patches: (node.id, neighbour.id),
                                edges: (j as i32, k as i32),
                            });
                        }
                    }
                    None => out.push(PatchInterface {
                        patches: (node.id, -1),
                        edges: (j as i32, -1),
                    }),
                }
            }
        }
        out
    }

    /// Maps tensor-product element indices `patch * n^2 + y * n + x` to leaf
    /// ids. Assumes uniform refinement.
    pub fn compute_reordering_vector(&self) -> Vec<usize> {
        let mut out = vec![0; self.number_of_elements];
        let n = 1usize << self.max_level;
        for node in self.leafs() {
            let h = node.h();
            let mid = node.reference_midpoint();
            let x_index = (mid.x / h).floor() as usize;
            let y_index = (mid.y / h).floor() as usize;
            let tp_index = node.patch as usize * n * n + y_index * n + x_index;
            out[tp_index] = node.id as usize;
        }
        out
    }

    /// Id unique across all levels of the tree.
    pub fn global_id(&self, node: &ElementTreeNode) -> usize {
        self.number_of_patches * (((1usize << (2 * node.level as usize)) - 1) / 3)
            + node.id as usize
    }

    fn collect_leafs(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.number_of_elements);
        let mut stack: Vec<usize> = self.nodes[0].sons.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                out.push(index);
            } else {
                stack.extend(node.sons.iter().rev().copied());
            }
        }
        out
    }

    fn compute_enclosings_recursion(&mut self, index: usize, points: &DMatrix<f64>) {
        let sons = self.nodes[index].sons.clone();
        let (mp1, r1, mp2, r2) = if sons.is_empty() {
            // leaf balls from the two pairs of opposite corners
            let corner = |v: usize| points.fixed_view::<3, 1>(0, v).into_owned();
            let v = &self.nodes[index].vertices;
            let (mp1, r1) = enclosing_ball(&corner(v[0]), 0.0, &corner(v[2]), 0.0);
            let (mp2, r2) = enclosing_ball(&corner(v[1]), 0.0, &corner(v[3]), 0.0);
            (mp1, r1, mp2, r2)
        } else {
            for &son in &sons {
                self.compute_enclosings_recursion(son, points);
            }
            // fathers take the union of their sons bottom-up
            let (mp1, r1) = enclosing_ball(
                &self.nodes[sons[0]].midpoint,
                self.nodes[sons[0]].radius,
                &self.nodes[sons[2]].midpoint,
                self.nodes[sons[2]].radius,
            );
            let (mp2, r2) = enclosing_ball(
                &self.nodes[sons[1]].midpoint,
                self.nodes[sons[1]].radius,
                &self.nodes[sons[3]].midpoint,
                self.nodes[sons[3]].radius,
            );
            (mp1, r1, mp2, r2)
        };
        let (midpoint, radius) = enclosing_ball(&mp1, r1, &mp2, r2);
        self.nodes[index].midpoint = midpoint;
        self.nodes[index].radius = radius;
    }

    fn refine_leaf(&mut self, index: usize) {
        if !self.nodes[index].is_leaf() {
            return;
        }
        // side of each neighbour that faces this element
        let mut facing = [None; 4];
        for i in 0..4 {
            if let Some(n) = self.nodes[index].adjacents[i] {
                facing[i] = (0..4).find(|&j| self.nodes[n].adjacents[j] == Some(index));
            }
        }
        // edge midpoints, reused from refined neighbours where possible
        let mut point_ids = [0usize; 5];
        let mut stencil = Vec::new();
        for i in 0..4 {
            let refined_neighbour = match (self.nodes[index].adjacents[i], facing[i]) {
                (Some(n), Some(side)) if !self.nodes[n].is_leaf() => Some((n, side)),
                _ => None,
            };
            match refined_neighbour {
                Some((n, side)) => {
                    let son = self.nodes[n].sons[side];
                    point_ids[i] = self.nodes[son].vertices[(side + 1) % 4];
                    // the two neighbour sons touching the shared edge
                    stencil.push(son);
                    stencil.push(self.nodes[n].sons[(side + 1) % 4]);
                }
                None => {
                    point_ids[i] = self.number_of_points;
                    self.number_of_points += 1;
                }
            }
        }
        // the centre is always a new point
        point_ids[4] = self.number_of_points;
        self.number_of_points += 1;

        let parent = &self.nodes[index];
        let parent_id = parent.id;
        let parent_level = parent.level;
        let parent_patch = parent.patch;
        let parent_llc = parent.llc;
        let h = parent.h();
        let v = [
            parent.vertices[0],
            parent.vertices[1],
            parent.vertices[2],
            parent.vertices[3],
        ];
        let vertex_sets = [
            [v[0], point_ids[0], point_ids[4], point_ids[3]],
            [point_ids[0], v[1], point_ids[1], point_ids[4]],
            [point_ids[4], point_ids[1], v[2], point_ids[2]],
            [point_ids[3], point_ids[4], point_ids[2], v[3]],
        ];
        let mut sons = Vec::with_capacity(4);
        for (i, vertices) in vertex_sets.iter().enumerate() {
            let son = ElementTreeNode {
                llc: parent_llc + Vector2::new(SON_LLCS[0][i], SON_LLCS[1][i]) * h,
                vertices: vertices.to_vec(),
                id: 4 * parent_id + i as i32,
                level: parent_level + 1,
                patch: parent_patch,
                ..Default::default()
            };
            let son_index = self.nodes.len();
            self.nodes.push(son);
            sons.push(son_index);
            stencil.push(son_index);
        }
        self.nodes[index].sons = sons;
        self.number_of_elements += 3;
        self.max_level = self.max_level.max((parent_level + 1) as usize);
        self.update_topology(&stencil);
    }

    /// Rebuilds the adjacency relations between the given elements through
    /// their shared edges.
    fn update_topology(&mut self, elements: &[usize]) {
        let mut edges: HashMap<(usize, usize), usize> = HashMap::new();
        for &element in elements {
            for j in 0..4 {
                let v1 = self.nodes[element].vertices[j];
                let v2 = self.nodes[element].vertices[(j + 1) % 4];
                let key = (v1.min(v2), v1.max(v2));
                if let Some(&other) = edges.get(&key) {
                    self.nodes[element].adjacents[j] = Some(other);
                    // find the matching edge of the element that claimed it
                    for k in 0..4 {
                        let v3 = self.nodes[other].vertices[k];
                        let v4 = self.nodes[other].vertices[(k + 1) % 4];
                        if key == (v3.min(v4), v3.max(v4)) {
                            self.nodes[other].adjacents[k] = Some(element);
                            break;
                        }
                    }
                } else {
                    edges.insert(key, element);
                }
            }
        }
    }
}

/// A ball containing the union of two balls. Degenerates to the larger ball
/// whenever one contains the other.
pub fn enclosing_ball(
    mp1: &Vector3<f64>,
    r1: f64,
    mp2: &Vector3<f64>,
    r2: f64,
) -> (Vector3<f64>, f64) {
    let z = mp1 - mp2;
    let norm = z.norm();
    if norm + r2 <= r1 {
        (*mp1, r1)
    } else if norm + r1 <= r2 {
        (*mp2, r2)
    } else {
        (0.5 * (mp1 + mp2 + (r1 - r2) / norm * z), 0.5 * (r1 + r2 + norm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Patch;

    fn screen_geometry(level: usize) -> (Geometry, ElementTree) {
        let x = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 1.0]);
        let y = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 1.0]);
        let z = DMatrix::zeros(2, 2);
        let w = DMatrix::repeat(2, 2, 1.0);
        let knots = [0.0, 0.0, 1.0, 1.0];
        let patch = Patch::new(&[x, y, z, w], &knots, &knots).unwrap();
        let geometry = Geometry::from_patches(vec![patch]);
        let tree = ElementTree::new(&geometry, level);
        (geometry, tree)
    }

    #[test]
    fn test_counts_after_uniform_refinement() {
        let (_, tree) = screen_geometry(2);
        assert_eq!(tree.max_level(), 2);
        assert_eq!(tree.number_of_elements(), 16);
        assert_eq!(tree.number_of_leafs(), 16);
        // a 4 x 4 grid of elements carries a 5 x 5 grid of vertices
        assert_eq!(tree.number_of_points(), 25);
    }

    #[test]
    fn test_leaf_ids_match_positions() {
        let (_, tree) = screen_geometry(3);
        for (position, node) in tree.leafs().enumerate() {
            assert_eq!(node.id as usize, position);
            assert_eq!(node.level, 3);
        }
    }

    #[test]
    fn test_vertices_are_shared_between_neighbours() {
        let (_, tree) = screen_geometry(2);
        for node in tree.leafs() {
            for j in 0..4 {
                if let Some(n) = node.adjacents[j] {
                    let neighbour = tree.node(n);
                    let shared = node
                        .vertices
                        .iter()
                        .filter(|v| neighbour.vertices.contains(v))
                        .count();
                    assert_eq!(shared, 2);
                }
            }
        }
    }

    #[test]
    fn test_point_list_matches_geometry() {
        let (geometry, tree) = screen_geometry(1);
        let points = tree.generate_point_list();
        for node in tree.leafs() {
            let patch = &geometry.patches()[node.patch as usize];
            let h = node.h();
            let expected = patch.eval(&(node.llc + Vector2::new(h, h)));
            let stored = points.column(node.vertices[2]);
            assert!((expected - stored).norm() < 1e-12);
        }
    }

    #[test]
    fn test_enclosing_balls_contain_vertices() {
        let (_, mut tree) = screen_geometry(2);
        let points = tree.compute_element_enclosings();
        let indices: Vec<usize> = tree.level_indices(1).into_iter().chain(tree.level_indices(2)).collect();
        for index in indices {
            let node = tree.node(index);
            for leaf in tree.leafs() {
                if leaf.id as usize / (1 << (2 * (2 - node.level as usize))) != node.id as usize {
                    continue;
                }
                for &v in &leaf.vertices {
                    let distance = (points.column(v) - node.midpoint).norm();
                    assert!(distance <= node.radius + 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_enclosing_ball_union() {
        let (mp, r) = enclosing_ball(
            &Vector3::new(0.0, 0.0, 0.0),
            1.0,
            &Vector3::new(4.0, 0.0, 0.0),
            1.0,
        );
        assert!((mp - Vector3::new(2.0, 0.0, 0.0)).norm() < 1e-14);
        assert!((r - 3.0).abs() < 1e-14);
        // containment keeps the big ball
        let (mp, r) = enclosing_ball(
            &Vector3::new(0.0, 0.0, 0.0),
            2.0,
            &Vector3::new(1.0, 0.0, 0.0),
            0.5,
        );
        assert_eq!(r, 2.0);
        assert!(mp.norm() < 1e-14);
    }

    #[test]
    fn test_reordering_vector_recovers_tensor_grid() {
        let (_, tree) = screen_geometry(2);
        let reordering = tree.compute_reordering_vector();
        let n = 4;
        for node in tree.leafs() {
            let mid = node.reference_midpoint();
            let x = (mid.x * n as f64).floor() as usize;
            let y = (mid.y * n as f64).floor() as usize;
            assert_eq!(reordering[y * n + x], node.id as usize);
        }
    }

    #[test]
    fn test_global_ids_are_level_transcending() {
        let (_, tree) = screen_geometry(2);
        // single patch: level 0 occupies id 0, level 1 ids 1..5, level 2 ids 5..21
        let patch_node = tree.node(tree.root().sons[0]);
        assert_eq!(tree.global_id(patch_node), 0);
        let labels = tree.generate_element_labels();
        assert_eq!(labels[0], 5);
        assert_eq!(labels[15], 20);
    }

    #[test]
    fn test_boundary_labels_on_single_patch() {
        let (_, tree) = screen_geometry(1);
        // all four elements of a single screen touch the boundary
        assert!(tree.generate_patch_boundary_labels().iter().all(|&l| l == -1));
        assert!(tree.identify_patch(0).iter().all(|&p| p));
    }

    #[test]
    fn test_cluster_leaf_range() {
        let (_, tree) = screen_geometry(2);
        let level_one = tree.level_indices(1);
        let node = tree.node(level_one[1]);
        assert_eq!(tree.cluster_leaf_range(node), 4..8);
    }
}
