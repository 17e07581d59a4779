//! The mesh collaborator consumed by the assembly.
use crate::element::ElementSignature;
use crate::Real;
use eyre::eyre;
use rustc_hash::FxHashMap;

pub mod procedural;

/// Element-to-node connectivity of a single element family.
///
/// Node indices are global: they address rows of the global system directly, and the scatter
/// orders local nodes by them.
pub trait ElementConnectivity {
    fn num_nodes(&self) -> usize;

    fn num_elements(&self) -> usize;

    fn nodes_per_element(&self) -> usize;

    /// Global node indices of an element, in node ordinal order.
    fn element_nodes(&self, element: usize) -> &[usize];
}

/// A part of a mesh with a single element topology and order.
pub trait MeshPart<T: Real>: ElementConnectivity + Sync {
    fn signature(&self) -> ElementSignature;

    /// Nodal coordinates stored node-major, `dim` values per node.
    fn coordinates(&self) -> &[T];

    fn field(&self, name: &str) -> Option<&NodalField<T>>;

    fn dimension(&self) -> usize {
        self.signature().dimension()
    }
}

/// A field with a fixed number of components per node, stored node-major.
#[derive(Debug, Clone, PartialEq)]
pub struct NodalField<T> {
    num_components: usize,
    values: Vec<T>,
}

impl<T: Real> NodalField<T> {
    pub fn zeros(num_nodes: usize, num_components: usize) -> Self {
        Self {
            num_components,
            values: vec![T::zero(); num_nodes * num_components],
        }
    }

    /// # Panics
    ///
    /// Panics if the number of values is not a multiple of the number of components.
    pub fn from_values(num_components: usize, values: Vec<T>) -> Self {
        assert!(num_components > 0);
        assert_eq!(values.len() % num_components, 0);
        Self { num_components, values }
    }

    /// Evaluates a function of the node coordinates at every node.
    pub fn from_fn(coordinates: &[T], dim: usize, num_components: usize, mut f: impl FnMut(&[T], &mut [T])) -> Self {
        let num_nodes = coordinates.len() / dim;
        let mut field = Self::zeros(num_nodes, num_components);
        for (x, value) in coordinates
            .chunks_exact(dim)
            .zip(field.values.chunks_exact_mut(num_components))
        {
            f(x, value);
        }
        field
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn num_nodes(&self) -> usize {
        self.values.len() / self.num_components
    }

    pub fn node_values(&self, node: usize) -> &[T] {
        let c = self.num_components;
        &self.values[node * c..(node + 1) * c]
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }
}

/// An in-memory mesh part.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBlock<T> {
    signature: ElementSignature,
    connectivity: Vec<usize>,
    coordinates: Vec<T>,
    fields: FxHashMap<String, NodalField<T>>,
}

impl<T: Real> ElementBlock<T> {
    /// Creates a block from flattened connectivity (`npe` global nodes per element) and
    /// node-major coordinates.
    pub fn new(signature: ElementSignature, connectivity: Vec<usize>, coordinates: Vec<T>) -> eyre::Result<Self> {
        let npe = signature.nodes_per_element();
        let dim = signature.dimension();
        if connectivity.len() % npe != 0 {
            return Err(eyre!(
                "Connectivity length {} is not a multiple of {} nodes per element",
                connectivity.len(),
                npe
            ));
        }
        if coordinates.len() % dim != 0 {
            return Err(eyre!("Coordinates length {} is not a multiple of dimension {}", coordinates.len(), dim));
        }
        let num_nodes = coordinates.len() / dim;
        if let Some(&node) = connectivity.iter().find(|&&node| node >= num_nodes) {
            return Err(eyre!("Node index {} out of bounds for {} nodes", node, num_nodes));
        }

        Ok(Self {
            signature,
            connectivity,
            coordinates,
            fields: FxHashMap::default(),
        })
    }

    /// Adds or replaces a nodal field.
    pub fn insert_field(&mut self, name: impl Into<String>, field: NodalField<T>) -> eyre::Result<()> {
        if field.num_nodes() != self.num_nodes() {
            return Err(eyre!(
                "Field has {} nodes, but the block has {}",
                field.num_nodes(),
                self.num_nodes()
            ));
        }
        self.fields.insert(name.into(), field);
        Ok(())
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut NodalField<T>> {
        self.fields.get_mut(name)
    }

    /// Applies a transformation to the coordinates of every node.
    pub fn transform_coordinates(&mut self, mut transform: impl FnMut(&mut [T])) {
        let dim = self.signature.dimension();
        for x in self.coordinates.chunks_exact_mut(dim) {
            transform(x);
        }
    }

    pub fn connectivity(&self) -> &[usize] {
        &self.connectivity
    }
}

impl<T: Real> ElementConnectivity for ElementBlock<T> {
    fn num_nodes(&self) -> usize {
        self.coordinates.len() / self.signature.dimension()
    }

    fn num_elements(&self) -> usize {
        self.connectivity.len() / self.signature.nodes_per_element()
    }

    fn nodes_per_element(&self) -> usize {
        self.signature.nodes_per_element()
    }

    fn element_nodes(&self, element: usize) -> &[usize] {
        let npe = self.signature.nodes_per_element();
        &self.connectivity[element * npe..(element + 1) * npe]
    }
}

impl<T: Real> MeshPart<T> for ElementBlock<T> {
    fn signature(&self) -> ElementSignature {
        self.signature
    }

    fn coordinates(&self) -> &[T] {
        &self.coordinates
    }

    fn field(&self, name: &str) -> Option<&NodalField<T>> {
        self.fields.get(name)
    }
}
