use cvfem_quadrature::univariate::{gauss, gauss_lobatto, map_to_interval, try_gauss_lobatto};
use cvfem_quadrature::{integrate, Error, QuadratureType};

use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;

fn monomial_integral(alpha: i32, a: f64, b: f64) -> f64 {
    (b.powi(alpha + 1) - a.powi(alpha + 1)) / (alpha as f64 + 1.0)
}

#[test]
fn gauss_rules_integrate_monomials_exactly() {
    for n in 1..=40 {
        let expected_polynomial_degree = 2 * n - 1;
        let rule = gauss(n);

        assert!(rule.0.iter().all(|&w| w > 0.0));
        assert!(rule.1.windows(2).all(|pair| pair[0][0] < pair[1][0]));

        for alpha in 0..=expected_polynomial_degree as i32 {
            let estimated = integrate(&rule, |&[x]| x.powi(alpha));
            assert_scalar_eq!(estimated, monomial_integral(alpha, -1.0, 1.0), comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn gauss_lobatto_rules_integrate_monomials_exactly() {
    assert!(try_gauss_lobatto(0).is_none());
    assert!(try_gauss_lobatto(1).is_none());

    for n in 2..=16 {
        let expected_polynomial_degree = 2 * n - 3;
        let rule = gauss_lobatto(n);

        assert_eq!(rule.1.first().unwrap(), &[-1.0]);
        assert_eq!(rule.1.last().unwrap(), &[1.0]);
        assert!(rule.0.iter().all(|&w| w > 0.0));

        for alpha in 0..=expected_polynomial_degree as i32 {
            let estimated = integrate(&rule, |&[x]| x.powi(alpha));
            assert_scalar_eq!(estimated, monomial_integral(alpha, -1.0, 1.0), comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn gauss_lobatto_points_are_ascending_and_symmetric() {
    for n in 2..=16 {
        let (weights, points) = gauss_lobatto(n);
        assert!(points.windows(2).all(|pair| pair[0][0] < pair[1][0]));
        for i in 0..n {
            assert_eq!(points[i][0], -points[n - 1 - i][0]);
            assert_scalar_eq!(weights[i], weights[n - 1 - i], comp = abs, tol = 1e-14);
        }
        if n % 2 == 1 {
            assert_eq!(points[n / 2][0], 0.0);
        }
    }
}

#[test]
fn gauss_lobatto_known_values() {
    let (weights, points) = gauss_lobatto(3);
    assert_eq!(points, vec![[-1.0], [0.0], [1.0]]);
    assert_scalar_eq!(weights[0], 1.0 / 3.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(weights[1], 4.0 / 3.0, comp = abs, tol = 1e-14);

    let (_, points) = gauss_lobatto(4);
    let expected = (1.0f64 / 5.0).sqrt();
    assert_scalar_eq!(points[1][0], -expected, comp = abs, tol = 1e-14);
    assert_scalar_eq!(points[2][0], expected, comp = abs, tol = 1e-14);
}

#[test]
fn quadrature_type_is_parsed_from_name() {
    assert_eq!("GaussLegendre".parse::<QuadratureType>(), Ok(QuadratureType::GaussLegendre));
    assert_eq!(
        "GaussChebyshev".parse::<QuadratureType>(),
        Err(Error::UnknownRule("GaussChebyshev".to_string()))
    );
    assert_eq!(QuadratureType::GaussLegendre.to_string(), "GaussLegendre");
    assert_eq!(QuadratureType::GaussLegendre.rule(3), gauss(3));
}

proptest! {
    #[test]
    fn mapped_gauss_rules_integrate_over_interval(
        n in 1usize..=8,
        a in -5.0f64..5.0,
        length in 0.01f64..3.0,
    ) {
        let b = a + length;
        let rule = map_to_interval(&gauss(n), a, b);
        prop_assert!(rule.1.iter().all(|&[x]| a < x && x < b));
        for alpha in 0..=(2 * n - 1) as i32 {
            let estimated = integrate(&rule, |&[x]| x.powi(alpha));
            let exact = monomial_integral(alpha, a, b);
            let scale = length * a.abs().max(b.abs()).max(1.0).powi(alpha);
            prop_assert!((estimated - exact).abs() <= 1e-12 * scale);
        }
    }
}
