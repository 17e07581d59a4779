use cvfem_quadrature::integrate;
use cvfem_quadrature::tensor::{hexahedron_gauss, quadrilateral_gauss, tensor_product};
use cvfem_quadrature::univariate::gauss_lobatto;
use matrixcompare::assert_scalar_eq;

fn monomial_integral_1d(alpha: i32) -> f64 {
    (1.0 - (-1.0f64).powi(alpha + 1)) / (alpha as f64 + 1.0)
}

#[test]
fn quadrilateral_gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=10 {
        // Exact along each dimension separately
        let expected_polynomial_degree = 2 * n - 1;
        let rule = quadrilateral_gauss(n);
        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree as i32 {
            for beta in 0..=expected_polynomial_degree as i32 {
                let estimated = integrate(&rule, |&[x, y]| x.powi(alpha) * y.powi(beta));
                let exact = monomial_integral_1d(alpha) * monomial_integral_1d(beta);
                assert_scalar_eq!(estimated, exact, comp = abs, tol = 1e-13);
            }
        }
    }
}

#[test]
fn hexahedron_gauss_rules_satisfy_expected_accuracy() {
    for n in 1..=5 {
        let expected_polynomial_degree = 2 * n - 1;
        let rule = hexahedron_gauss(n);
        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree as i32 {
            for beta in 0..=expected_polynomial_degree as i32 {
                for gamma in 0..=expected_polynomial_degree as i32 {
                    let estimated =
                        integrate(&rule, |&[x, y, z]| x.powi(alpha) * y.powi(beta) * z.powi(gamma));
                    let exact =
                        monomial_integral_1d(alpha) * monomial_integral_1d(beta) * monomial_integral_1d(gamma);
                    assert_scalar_eq!(estimated, exact, comp = abs, tol = 1e-13);
                }
            }
        }
    }
}

#[test]
fn tensor_product_enumerates_first_axis_fastest() {
    let rule1d = gauss_lobatto(3);
    let (weights, points) = tensor_product::<2>(&rule1d);
    assert_eq!(points.len(), 9);
    assert_eq!(points[0], [-1.0, -1.0]);
    assert_eq!(points[1], [0.0, -1.0]);
    assert_eq!(points[2], [1.0, -1.0]);
    assert_eq!(points[3], [-1.0, 0.0]);
    assert_eq!(points[8], [1.0, 1.0]);
    assert_scalar_eq!(weights[4], rule1d.0[1] * rule1d.0[1], comp = abs, tol = 1e-15);
    assert_scalar_eq!(weights.iter().sum::<f64>(), 4.0, comp = abs, tol = 1e-14);
}
