use crate::element::{ElementSignature, Topology};
use crate::error::ConfigurationError;
use crate::Real;
use cvfem_quadrature::univariate::gauss_lobatto;
use nalgebra::{convert, DMatrix};
use std::slice::ChunksExact;

/// The highest polynomial order for which element layouts are provided.
pub const MAX_POLY_ORDER: usize = 10;

/// Vertices of the reference quadrilateral, counter-clockwise, as multiples of the order `p`.
const QUAD_VERTICES: [[usize; 2]; 4] = [[0, 0], [1, 0], [1, 1], [0, 1]];
const QUAD_EDGES: [[usize; 2]; 4] = [[0, 1], [1, 2], [2, 3], [3, 0]];

/// Bottom face then top face, each counter-clockwise.
const HEX_VERTICES: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];
const HEX_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];
/// Hexahedron faces as (normal axis, coordinate as a multiple of `p`), in side order.
const HEX_FACES: [(usize, usize); 6] = [(1, 0), (0, 1), (1, 1), (0, 0), (2, 0), (2, 1)];

/// Node layout of a tensor-product element of a given dimension and polynomial order.
///
/// Nodes sit at the tensor product of the `p + 1` Gauss-Lobatto-Legendre points on `[-1, 1]`.
/// Each node is identified both by its tensor indices `(i, j[, k])` and by its *ordinal*, the
/// linear index used for element connectivity. Ordinals are hierarchical: vertices, then
/// edge-interior nodes, then face-interior nodes (hexahedra only), then element-interior nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDescription<T> {
    dimension: usize,
    poly_order: usize,
    nodes_per_element: usize,
    node_locations: Vec<T>,
    // Indexed by the lexicographic tensor index (first axis fastest)
    node_map: Vec<usize>,
    // `dimension` tensor indices per node ordinal
    inverse_node_map: Vec<usize>,
}

impl<T: Real> ElementDescription<T> {
    pub fn create(dimension: usize, poly_order: usize) -> Result<Self, ConfigurationError> {
        if !(2..=3).contains(&dimension) || poly_order == 0 || poly_order > MAX_POLY_ORDER {
            return Err(ConfigurationError::UnsupportedTopology { dimension, poly_order });
        }

        let nodes_1d = poly_order + 1;
        let nodes_per_element = nodes_1d.pow(dimension as u32);

        let inverse_node_map = hierarchical_tensor_indices(dimension, poly_order);
        debug_assert_eq!(inverse_node_map.len(), dimension * nodes_per_element);

        let mut node_map = vec![usize::MAX; nodes_per_element];
        for (ordinal, indices) in inverse_node_map.chunks_exact(dimension).enumerate() {
            node_map[lexicographic_index(indices, nodes_1d)] = ordinal;
        }
        debug_assert!(node_map.iter().all(|&ordinal| ordinal < nodes_per_element));

        let (_, points) = gauss_lobatto(nodes_1d);
        let node_locations = points.into_iter().map(|[x]| convert(x)).collect();

        Ok(Self {
            dimension,
            poly_order,
            nodes_per_element,
            node_locations,
            node_map,
            inverse_node_map,
        })
    }

    pub fn for_signature(signature: &ElementSignature) -> Result<Self, ConfigurationError> {
        Self::create(signature.dimension(), signature.poly_order)
    }

    /// Coordinates of the nodes as a `dim x npe` matrix, one column per node ordinal.
    pub fn reference_node_coordinates(&self) -> DMatrix<T> {
        DMatrix::from_fn(self.dimension, self.nodes_per_element, |d, node| {
            self.node_locations[self.tensor_indices(node)[d]]
        })
    }
}

impl<T> ElementDescription<T> {
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn poly_order(&self) -> usize {
        self.poly_order
    }

    pub fn nodes_1d(&self) -> usize {
        self.poly_order + 1
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    pub fn signature(&self) -> ElementSignature {
        let topology = if self.dimension == 2 { Topology::Quad } else { Topology::Hex };
        ElementSignature::new(topology, self.poly_order)
    }

    /// The 1D node locations, in ascending order.
    pub fn node_locations_1d(&self) -> &[T] {
        &self.node_locations
    }

    /// The node ordinal for the given tensor indices.
    ///
    /// # Panics
    ///
    /// Panics if the number of indices differs from the dimension or an index exceeds the
    /// polynomial order.
    pub fn node_map(&self, tensor_indices: &[usize]) -> usize {
        assert_eq!(tensor_indices.len(), self.dimension, "Wrong number of tensor indices");
        assert!(
            tensor_indices.iter().all(|&i| i <= self.poly_order),
            "Tensor index out of bounds"
        );
        self.node_map[lexicographic_index(tensor_indices, self.nodes_1d())]
    }

    /// The tensor indices of the given node ordinal.
    pub fn tensor_indices(&self, node: usize) -> &[usize] {
        let d = self.dimension;
        &self.inverse_node_map[d * node..d * (node + 1)]
    }

    /// Iterates over the tensor indices of all nodes, in node ordinal order.
    pub fn inverse_node_map(&self) -> ChunksExact<'_, usize> {
        self.inverse_node_map.chunks_exact(self.dimension)
    }
}

fn lexicographic_index(tensor_indices: &[usize], nodes_1d: usize) -> usize {
    tensor_indices
        .iter()
        .rev()
        .fold(0, |linear, &i| linear * nodes_1d + i)
}

/// Lists the tensor indices of every node, flattened, in hierarchical ordinal order.
fn hierarchical_tensor_indices(dimension: usize, p: usize) -> Vec<usize> {
    let (vertices, edges): (Vec<&[usize]>, &[[usize; 2]]) = match dimension {
        2 => (QUAD_VERTICES.iter().map(|v| v.as_slice()).collect(), QUAD_EDGES.as_slice()),
        _ => (HEX_VERTICES.iter().map(|v| v.as_slice()).collect(), HEX_EDGES.as_slice()),
    };

    let mut indices = Vec::with_capacity(dimension * (p + 1).pow(dimension as u32));
    for vertex in &vertices {
        indices.extend(vertex.iter().map(|&c| c * p));
    }

    for &[a, b] in edges {
        let start: Vec<usize> = vertices[a].iter().map(|&c| c * p).collect();
        let axis = (0..dimension)
            .find(|&d| vertices[a][d] != vertices[b][d])
            .expect("Internal error: edge endpoints must differ along one axis");
        for s in 1..p {
            let mut t = start.clone();
            t[axis] = if start[axis] == 0 { s } else { p - s };
            indices.extend_from_slice(&t);
        }
    }

    if dimension == 3 {
        for &(normal, side) in &HEX_FACES {
            let (a, b) = match normal {
                0 => (1, 2),
                1 => (0, 2),
                _ => (0, 1),
            };
            for j in 1..p {
                for i in 1..p {
                    let mut t = [0; 3];
                    t[normal] = side * p;
                    t[a] = i;
                    t[b] = j;
                    indices.extend_from_slice(&t);
                }
            }
        }
        for k in 1..p {
            for j in 1..p {
                for i in 1..p {
                    indices.extend_from_slice(&[i, j, k]);
                }
            }
        }
    } else {
        for j in 1..p {
            for i in 1..p {
                indices.extend_from_slice(&[i, j]);
            }
        }
    }

    indices
}
