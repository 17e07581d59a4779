use super::{poly_der, poly_val, random_coefficients, tensor_poly};
use cvfem::element::{ElementDescription, LagrangeBasis};
use matrixcompare::assert_scalar_eq;
use nalgebra::{DMatrix, DMatrixView, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A regular grid of points covering `[-1.05, 1.05]^dim`, as a `dim x npts` matrix.
fn evaluation_points(dim: usize, per_axis: usize) -> DMatrix<f64> {
    let coordinate = |i: usize| -1.05 + 2.1 * i as f64 / (per_axis - 1) as f64;
    let npts = per_axis.pow(dim as u32);
    DMatrix::from_fn(dim, npts, |d, j| coordinate((j / per_axis.pow(d as u32)) % per_axis))
}

fn column(points: &DMatrix<f64>, j: usize) -> Vec<f64> {
    points.column(j).iter().copied().collect()
}

fn nodal_samples(description: &ElementDescription<f64>, coeffs: &[Vec<f64>]) -> DVector<f64> {
    let nodes = description.reference_node_coordinates();
    DVector::from_fn(nodes.ncols(), |j, _| tensor_poly(coeffs, &column(&nodes, j)))
}

#[test]
fn basis_interpolates_polynomials_of_element_degree() {
    let mut rng = StdRng::seed_from_u64(0);
    for dim in [2, 3] {
        for p in 1..=5 {
            let description = ElementDescription::<f64>::create(dim, p).unwrap();
            let basis = LagrangeBasis::from_description(&description);
            let coeffs = random_coefficients(&mut rng, dim, p);
            let nodal = nodal_samples(&description, &coeffs);

            let points = evaluation_points(dim, 5);
            let weights = basis.eval_basis_weights(DMatrixView::from(&points));
            assert_eq!(weights.shape(), (points.ncols(), description.nodes_per_element()));
            let interpolated = &weights * &nodal;
            for j in 0..points.ncols() {
                let x = column(&points, j);
                assert_scalar_eq!(interpolated[j], tensor_poly(&coeffs, &x), comp = abs, tol = 1e-10);
            }
        }
    }
}

#[test]
fn derivative_weights_reproduce_polynomial_derivatives() {
    let mut rng = StdRng::seed_from_u64(1);
    for dim in [2, 3] {
        for p in 1..=5 {
            let description = ElementDescription::<f64>::create(dim, p).unwrap();
            let basis = LagrangeBasis::from_description(&description);
            let coeffs = random_coefficients(&mut rng, dim, p);
            let nodal = nodal_samples(&description, &coeffs);

            let points = evaluation_points(dim, 4);
            let weights = basis.eval_deriv_weights(DMatrixView::from(&points));
            assert_eq!(weights.shape(), (points.ncols() * dim, description.nodes_per_element()));
            let derivatives = &weights * &nodal;
            for j in 0..points.ncols() {
                let x = column(&points, j);
                for d in 0..dim {
                    let expected: f64 = (0..dim)
                        .map(|e| {
                            if e == d {
                                poly_der(&coeffs[e], x[e])
                            } else {
                                poly_val(&coeffs[e], x[e])
                            }
                        })
                        .product();
                    assert_scalar_eq!(derivatives[j * dim + d], expected, comp = abs, tol = 1e-10);
                }
            }
        }
    }
}

#[test]
fn basis_is_nodal_and_a_partition_of_unity() {
    let description = ElementDescription::<f64>::create(3, 3).unwrap();
    let basis = LagrangeBasis::from_description(&description);
    let nodes = description.reference_node_coordinates();
    let weights = basis.eval_basis_weights(DMatrixView::from(&nodes));
    assert_eq!(weights, DMatrix::identity(64, 64));

    let mut phi = vec![0.0; 64];
    let mut gradients = vec![0.0; 64 * 3];
    basis.populate_basis(&mut phi, &[0.3, -0.7, 0.9]);
    basis.populate_basis_gradients(&mut gradients, &[0.3, -0.7, 0.9]);
    assert_scalar_eq!(phi.iter().sum::<f64>(), 1.0, comp = abs, tol = 1e-13);
    for d in 0..3 {
        let sum: f64 = gradients.iter().skip(d).step_by(3).sum();
        assert_scalar_eq!(sum, 0.0, comp = abs, tol = 1e-12);
    }
}

#[test]
fn single_point_evaluation_matches_batched_evaluation() {
    let description = ElementDescription::<f64>::create(2, 4).unwrap();
    let basis = LagrangeBasis::from_description(&description);
    let point = [0.25, -0.5];
    let points = DMatrix::from_column_slice(2, 1, &point);

    let mut phi = vec![0.0; 25];
    basis.populate_basis(&mut phi, &point);
    let weights = basis.eval_basis_weights(DMatrixView::from(&points));
    assert_eq!(weights.row(0).iter().copied().collect::<Vec<_>>(), phi);

    let mut gradients = vec![0.0; 50];
    basis.populate_basis_gradients(&mut gradients, &point);
    let derivatives = basis.eval_deriv_weights(DMatrixView::from(&points));
    for n in 0..25 {
        assert_eq!(derivatives[(0, n)], gradients[2 * n]);
        assert_eq!(derivatives[(1, n)], gradients[2 * n + 1]);
    }
}
