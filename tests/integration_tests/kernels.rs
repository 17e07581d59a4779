use super::{assemble_with, dense, interior_nodes, temperature_mesh};
use cvfem::assembly::AssembleElemSolverAlgorithm;
use cvfem::config::{AssemblyConfig, EquationSystem, SolutionOptions};
use cvfem::element::ElementSignature;
use cvfem::kernel::{
    ElemDataRequests, FieldRequest, Kernel, MasterElementData, ScratchViews, ScsDiffusionKernel,
    ScvTimeDerivativeKernel, SteadyThermalSourceKernel, TimeIntegrator,
};
use cvfem::linear_system::CsrLinearSystem;
use cvfem::master_element::MasterElementRepo;
use cvfem::mesh::{ElementBlock, ElementConnectivity, MeshPart, NodalField};
use cvfem::simd::{LaneMatrix, LaneVector};
use matrixcompare::assert_scalar_eq;
use nalgebra::DVector;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn temperature() -> EquationSystem {
    EquationSystem::new("temperature", 1).unwrap()
}

/// A unit square of biquadratic elements carrying constant fields.
fn constant_fields_mesh(fields: &[(&str, f64)]) -> ElementBlock<f64> {
    let mut mesh = temperature_mesh(ElementSignature::quad(2), 2, 0.0);
    for &(name, value) in fields {
        let field = NodalField::from_values(1, vec![value; mesh.num_nodes()]);
        mesh.insert_field(name, field).unwrap();
    }
    mesh
}

fn off_diagonal_amax(matrix: &nalgebra::DMatrix<f64>) -> f64 {
    let mut amax: f64 = 0.0;
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            if i != j {
                amax = amax.max(matrix[(i, j)].abs());
            }
        }
    }
    amax
}

#[test]
fn kernel_requests_are_merged() {
    let repo = MasterElementRepo::default();
    let mut algorithm = AssembleElemSolverAlgorithm::<f64>::new(
        temperature(),
        ElementSignature::quad(2),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &repo,
    )
    .unwrap();
    algorithm
        .add_kernel(ScsDiffusionKernel::new("temperature", 1, 1.0))
        .add_kernel(ScvTimeDerivativeKernel::new("temperature", "temperature_old", 1, 1.0));

    let requests = algorithm.data_requests();
    let names: Vec<&str> = requests
        .fields()
        .iter()
        .map(|request| request.name.as_str())
        .collect();
    assert_eq!(names, ["temperature", "temperature_old"]);
    assert_eq!(
        requests.fields()[1],
        FieldRequest {
            name: "temperature_old".to_string(),
            num_components: 1
        }
    );
    assert!(requests.contains(MasterElementData::ScsAreaVectors));
    assert!(requests.contains(MasterElementData::ScsGradOp));
    assert!(requests.contains(MasterElementData::ScvVolume));
    assert!(!requests.contains(MasterElementData::ScvGradOp));
}

#[test]
fn backward_euler_time_derivative_is_lumped() {
    let mesh = constant_fields_mesh(&[("temperature", 2.0), ("temperature_old", 1.0)]);
    let (system, _) = assemble_with(
        &mesh,
        temperature(),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &TimeIntegrator::bdf1(0.5, 0.5),
        |algorithm| {
            algorithm.add_kernel(ScvTimeDerivativeKernel::new("temperature", "temperature_old", 1, 1.0));
        },
    )
    .unwrap();

    let matrix = dense(&system);
    assert_eq!(off_diagonal_amax(&matrix), 0.0);
    assert!(matrix.diagonal().iter().all(|&v| v > 0.0));
    // rho / dt times the area of the unit square
    assert_scalar_eq!(matrix.diagonal().sum(), 2.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(system.rhs().sum(), -2.0, comp = abs, tol = 1e-12);
}

#[test]
fn bdf2_time_derivative_reads_the_older_level() {
    let mesh = constant_fields_mesh(&[
        ("temperature", 3.0),
        ("temperature_old", 2.0),
        ("temperature_older", 1.0),
    ]);
    let (system, _) = assemble_with(
        &mesh,
        temperature(),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &TimeIntegrator::bdf2(1.0, 0.5),
        |algorithm| {
            let kernel = ScvTimeDerivativeKernel::new("temperature", "temperature_old", 1, 1.0)
                .with_older_field("temperature_older");
            algorithm.add_kernel(kernel);
        },
    )
    .unwrap();

    let matrix = dense(&system);
    assert_eq!(off_diagonal_amax(&matrix), 0.0);
    assert_scalar_eq!(matrix.diagonal().sum(), 3.0, comp = abs, tol = 1e-12);
    // (1.5 * 3 - 2 * 2 + 0.5 * 1) / dt over the unit square
    assert_scalar_eq!(system.rhs().sum(), -2.0, comp = abs, tol = 1e-12);
}

#[test]
fn bdf2_without_the_older_level_is_rejected() {
    let mesh = constant_fields_mesh(&[("temperature", 3.0), ("temperature_old", 2.0)]);
    let result = assemble_with(
        &mesh,
        temperature(),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &TimeIntegrator::bdf2(1.0, 0.5),
        |algorithm| {
            algorithm.add_kernel(ScvTimeDerivativeKernel::new("temperature", "temperature_old", 1, 1.0));
        },
    );
    assert!(result.is_err());

    // First-order integration needs only the previous level
    let result = assemble_with(
        &mesh,
        temperature(),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &TimeIntegrator::bdf1(1.0, 0.5),
        |algorithm| {
            algorithm.add_kernel(ScvTimeDerivativeKernel::new("temperature", "temperature_old", 1, 1.0));
        },
    );
    assert!(result.is_ok());
}

/// Counts the assembly passes it was set up for.
struct SetupCounter {
    setups: Arc<AtomicUsize>,
}

impl Kernel<f64> for SetupCounter {
    fn data_requests(&self, requests: &mut ElemDataRequests) {
        requests.add_field("temperature", 1);
    }

    fn setup(&mut self, _time: &TimeIntegrator<f64>) -> eyre::Result<()> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn execute(&self, _lhs: &mut LaneMatrix<f64>, _rhs: &mut LaneVector<f64>, _scratch: &ScratchViews<f64>) {}
}

#[test]
fn kernels_are_set_up_only_for_validated_passes() {
    let setups = Arc::new(AtomicUsize::new(0));
    let repo = MasterElementRepo::default();
    let mut algorithm = AssembleElemSolverAlgorithm::new(
        temperature(),
        ElementSignature::quad(1),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &repo,
    )
    .unwrap();
    algorithm.add_kernel(SetupCounter {
        setups: Arc::clone(&setups),
    });

    let mesh = temperature_mesh(ElementSignature::quad(1), 2, 0.0);
    let bare = ElementBlock::new(
        ElementSignature::quad(1),
        mesh.connectivity().to_vec(),
        mesh.coordinates().to_vec(),
    )
    .unwrap();
    let steady = TimeIntegrator::steady();
    let mut system = CsrLinearSystem::new(mesh.num_nodes(), 1);

    assert!(algorithm.execute(&mesh, &mut system, &steady).is_err());
    assert_eq!(setups.load(Ordering::SeqCst), 0);

    algorithm.initialize_connectivity(&mesh, &mut system).unwrap();
    assert!(algorithm.execute(&bare, &mut system, &steady).is_err());
    assert_eq!(setups.load(Ordering::SeqCst), 0);

    algorithm.execute(&mesh, &mut system, &steady).unwrap();
    assert_eq!(setups.load(Ordering::SeqCst), 1);
}

#[test]
fn steady_integrator_disables_the_time_derivative() {
    let mesh = constant_fields_mesh(&[("temperature", 2.0), ("temperature_old", 1.0)]);
    let (system, report) = assemble_with(
        &mesh,
        temperature(),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &TimeIntegrator::steady(),
        |algorithm| {
            algorithm.add_kernel(ScvTimeDerivativeKernel::new("temperature", "temperature_old", 1, 1.0));
        },
    )
    .unwrap();
    assert_eq!(report.num_scattered_elements, 4);
    assert!(system.matrix().values().iter().all(|&v| v == 0.0));
    assert!(system.rhs().iter().all(|&v| v == 0.0));
}

#[test]
fn manufactured_source_integrates_over_the_domain() {
    let source = SteadyThermalSourceKernel::new(0.25, 1.0);
    assert_scalar_eq!(source.exact_temperature(&[0.0, 0.0]), 0.5, comp = abs, tol = 1e-14);
    assert_scalar_eq!(
        SteadyThermalSourceKernel::<f64>::default().exact_temperature(&[0.0, 0.0]),
        0.5,
        comp = abs,
        tol = 1e-14
    );

    let mesh = temperature_mesh(ElementSignature::quad(3), 4, 0.0);
    let (system, _) = assemble_with(
        &mesh,
        temperature(),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &TimeIntegrator::steady(),
        |algorithm| {
            algorithm.add_kernel(source.clone());
        },
    )
    .unwrap();

    assert!(system.matrix().values().iter().all(|&v| v == 0.0));
    // k / 4 (pi / 2)^2 * 2 * (2 / pi)
    assert_scalar_eq!(system.rhs().sum(), PI / 4.0, comp = abs, tol = 1e-7);
}

#[test]
fn steady_conduction_converges_to_the_manufactured_solution() {
    let source = SteadyThermalSourceKernel::new(0.25, 1.0);
    let mesh = zero_temperature_mesh();
    let (system, _) = assemble_with(
        &mesh,
        temperature(),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &TimeIntegrator::steady(),
        |algorithm| {
            algorithm
                .add_kernel(ScsDiffusionKernel::new("temperature", 1, 1.0))
                .add_kernel(source.clone());
        },
    )
    .unwrap();

    let dim = mesh.dimension();
    let exact = DVector::from_iterator(
        mesh.num_nodes(),
        mesh.coordinates()
            .chunks_exact(dim)
            .map(|x| source.exact_temperature(x)),
    );

    // Dirichlet conditions on the boundary nodes
    let interior = interior_nodes(&mesh);
    let mut matrix = dense(&system);
    let mut rhs = system.rhs().clone();
    for node in 0..mesh.num_nodes() {
        if interior.binary_search(&node).is_err() {
            matrix.row_mut(node).fill(0.0);
            matrix[(node, node)] = 1.0;
            rhs[node] = exact[node];
        }
    }

    // The current temperature is zero, so the increment is the solution itself
    let solution = matrix.lu().solve(&rhs).unwrap();

    let error = (&solution - &exact).amax();
    assert!(error < 5e-3, "max nodal error {error}");
}

fn zero_temperature_mesh() -> ElementBlock<f64> {
    let mut mesh = temperature_mesh(ElementSignature::quad(2), 4, 0.0);
    let zeros = NodalField::zeros(mesh.num_nodes(), 1);
    mesh.insert_field("temperature", zeros).unwrap();
    mesh
}

#[test]
fn vector_diffusion_decouples_components() {
    let mut mesh = temperature_mesh(ElementSignature::quad(2), 2, 0.02);
    let velocity = NodalField::from_fn(mesh.coordinates(), mesh.dimension(), 2, |x, out| {
        out[0] = x[0] - x[1];
        out[1] = 2.0 * x[0] * x[1];
    });
    mesh.insert_field("velocity", velocity).unwrap();

    let steady = TimeIntegrator::steady();
    let (scalar, _) = assemble_with(
        &mesh,
        temperature(),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &steady,
        |algorithm| {
            algorithm.add_kernel(ScsDiffusionKernel::new("temperature", 1, 1.0));
        },
    )
    .unwrap();
    let (vector, _) = assemble_with(
        &mesh,
        EquationSystem::new("velocity", 2).unwrap(),
        &SolutionOptions::default(),
        AssemblyConfig::default(),
        &steady,
        |algorithm| {
            algorithm.add_kernel(ScsDiffusionKernel::new("velocity", 2, 1.0));
        },
    )
    .unwrap();

    let scalar = dense(&scalar);
    let vector = dense(&vector);
    assert_eq!(vector.nrows(), 2 * scalar.nrows());
    for i in 0..scalar.nrows() {
        for j in 0..scalar.ncols() {
            for c in 0..2 {
                for c2 in 0..2 {
                    let expected = if c == c2 { scalar[(i, j)] } else { 0.0 };
                    assert_scalar_eq!(vector[(2 * i + c, 2 * j + c2)], expected, comp = abs, tol = 1e-12);
                }
            }
        }
    }
}
