use cvfem::element::ElementSignature;
use cvfem::linear_system::{CsrLinearSystem, LinearSystem, ScatterAdd};
use cvfem::mesh::{ElementBlock, ElementConnectivity};
use nalgebra::{DMatrix, DVector};

/// Two bilinear quads sharing the edge between nodes 1 and 4.
///
/// ```text
/// 3 --- 4 --- 5
/// |     |     |
/// 0 --- 1 --- 2
/// ```
fn two_quads() -> ElementBlock<f64> {
    let coords = vec![0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0];
    ElementBlock::new(ElementSignature::quad(1), vec![0, 1, 4, 3, 1, 2, 5, 4], coords).unwrap()
}

fn sort_permutation(nodes: &[usize]) -> Vec<usize> {
    let mut permutation: Vec<usize> = (0..nodes.len()).collect();
    permutation.sort_by_key(|&i| nodes[i]);
    permutation
}

#[test]
fn element_to_node_graph_couples_nodes_sharing_an_element() {
    let mesh = two_quads();
    let mut system = CsrLinearSystem::<f64>::new(mesh.num_nodes(), 1);
    system.build_elem_to_node_graph(&mesh).unwrap();

    let pattern = system.matrix().pattern();
    assert_eq!(pattern.nnz(), 4 * 4 + 2 * 6);
    assert_eq!(pattern.lane(0), &[0, 1, 3, 4]);
    assert_eq!(pattern.lane(1), &[0, 1, 2, 3, 4, 5]);
    assert!(system.matrix().values().iter().all(|&v| v == 0.0));
}

#[test]
fn graph_with_multiple_dofs_per_node_is_blocked() {
    let mesh = two_quads();
    let mut system = CsrLinearSystem::<f64>::new(mesh.num_nodes(), 2);
    system.build_elem_to_node_graph(&mesh).unwrap();
    assert_eq!(system.matrix().nrows(), 12);
    assert_eq!(system.matrix().pattern().nnz(), 4 * (4 * 4 + 2 * 6));
    assert_eq!(system.matrix().pattern().lane(1), &[0, 1, 2, 3, 6, 7, 8, 9]);
}

#[test]
fn graph_rejects_mismatched_node_count() {
    let mesh = two_quads();
    let mut system = CsrLinearSystem::<f64>::new(5, 1);
    assert!(system.build_elem_to_node_graph(&mesh).is_err());
}

#[test]
fn scatter_adds_element_blocks() {
    let mesh = two_quads();
    let mut system = CsrLinearSystem::<f64>::new(mesh.num_nodes(), 1);
    system.build_elem_to_node_graph(&mesh).unwrap();

    let lhs = DMatrix::from_fn(4, 4, |i, j| (10 * i + j) as f64);
    let rhs = [1.0, 2.0, 3.0, 4.0];
    {
        let access = system.scatter_access();
        for element in 0..2 {
            let nodes = mesh.element_nodes(element);
            unsafe {
                access.sum_into(nodes, &sort_permutation(nodes), &lhs, &rhs);
            }
        }
    }

    let dense = DMatrix::from(system.matrix());
    // Local (0, 2) of the first element is the global pair (0, 4)
    assert_eq!(dense[(0, 4)], 2.0);
    // Global (1, 4) is local (1, 2) of the first element and local (0, 3) of the second
    assert_eq!(dense[(1, 4)], 12.0 + 3.0);
    assert_eq!(dense[(0, 2)], 0.0);
    assert_eq!(system.rhs(), &DVector::from_column_slice(&[1.0, 3.0, 2.0, 4.0, 7.0, 3.0]));

    system.zero();
    assert!(system.matrix().values().iter().all(|&v| v == 0.0));
    assert!(system.rhs().iter().all(|&v| v == 0.0));
}

#[test]
fn scatter_tolerates_repeated_nodes() {
    // A collapsed element referring to node 0 twice
    let coords = vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0];
    let mesh = ElementBlock::new(ElementSignature::quad(1), vec![0, 1, 2, 0], coords).unwrap();
    let mut system = CsrLinearSystem::<f64>::new(3, 1);
    system.build_elem_to_node_graph(&mesh).unwrap();

    let lhs = DMatrix::repeat(4, 4, 1.0);
    let nodes = mesh.element_nodes(0);
    unsafe {
        system
            .scatter_access()
            .sum_into(nodes, &sort_permutation(nodes), &lhs, &[1.0; 4]);
    }
    let dense = DMatrix::from(system.matrix());
    assert_eq!(dense[(0, 0)], 4.0);
    assert_eq!(dense[(0, 1)], 2.0);
    assert_eq!(dense[(1, 1)], 1.0);
    assert_eq!(system.rhs()[0], 2.0);
}
