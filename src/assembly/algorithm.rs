use crate::assembly::batch::{BatchPlan, BatchWorkspace};
use crate::config::{AssemblyConfig, DegenerateElementPolicy, DiagonalRelaxation, EquationSystem, SolutionOptions};
use crate::element::ElementSignature;
use crate::error::ConfigurationError;
use crate::kernel::{ElemDataRequests, Kernel, TimeIntegrator};
use crate::linear_system::{LinearSystem, ScatterAdd};
use crate::master_element::{HigherOrderScs, HigherOrderScv, MasterElementRepo};
use crate::mesh::MeshPart;
use crate::simd::{extract_matrix_lane, extract_vector_lane};
use crate::Real;
use eyre::{eyre, WrapErr};
use log::{debug, trace, warn};
use rayon::prelude::*;
use std::cell::RefCell;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use thread_local::ThreadLocal;

/// Summary of one assembly pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    pub num_batches: usize,
    pub num_colors: usize,
    /// Elements whose local system was added to the global system.
    pub num_scattered_elements: usize,
    /// Mesh indices of elements with a degenerate Jacobian, in ascending order.
    pub degenerate_elements: Vec<usize>,
}

#[derive(Debug, Default)]
struct BatchOutcome {
    num_scattered: usize,
    degenerate: Vec<usize>,
}

/// Assembles the contributions of a list of kernels over one element block into a linear system.
///
/// Elements are processed in batches of `simd_width` consecutive elements. Batches are colored so
/// that batches of the same color share no node; colors are processed one after another and the
/// batches of a color concurrently.
pub struct AssembleElemSolverAlgorithm<T: Real> {
    equation: EquationSystem,
    signature: ElementSignature,
    config: AssemblyConfig,
    relaxation: DiagonalRelaxation<T>,
    scv: Arc<HigherOrderScv<T>>,
    scs: Arc<HigherOrderScs<T>>,
    kernels: Vec<Box<dyn Kernel<T>>>,
    requests: ElemDataRequests,
    plan: Option<BatchPlan>,
    workspace: ThreadLocal<RefCell<BatchWorkspace<T>>>,
}

impl<T: Real> Debug for AssembleElemSolverAlgorithm<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssembleElemSolverAlgorithm")
            .field("equation", &self.equation)
            .field("signature", &self.signature)
            .field("config", &self.config)
            .field("relaxation", &self.relaxation)
            .field("num_kernels", &self.kernels.len())
            .field("requests", &self.requests)
            .field("plan", &self.plan)
            .finish()
    }
}

impl<T: Real> AssembleElemSolverAlgorithm<T> {
    pub fn new(
        equation: EquationSystem,
        signature: ElementSignature,
        options: &SolutionOptions<T>,
        config: AssemblyConfig,
        repo: &MasterElementRepo<T>,
    ) -> Result<Self, ConfigurationError> {
        equation.validate()?;
        config.validate()?;
        let relaxation = DiagonalRelaxation::for_dof(&equation.dof_name, options)?;
        let scv = repo.scv(&signature)?;
        let scs = repo.scs(&signature)?;
        Ok(Self {
            equation,
            signature,
            config,
            relaxation,
            scv,
            scs,
            kernels: Vec::new(),
            requests: ElemDataRequests::default(),
            plan: None,
            workspace: ThreadLocal::new(),
        })
    }

    pub fn add_kernel<K: Kernel<T> + 'static>(&mut self, kernel: K) -> &mut Self {
        kernel.data_requests(&mut self.requests);
        self.kernels.push(Box::new(kernel));
        self
    }

    pub fn equation(&self) -> &EquationSystem {
        &self.equation
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    pub fn relaxation(&self) -> DiagonalRelaxation<T> {
        self.relaxation
    }

    pub fn data_requests(&self) -> &ElemDataRequests {
        &self.requests
    }

    /// The batch plan, available after [`Self::initialize_connectivity`].
    pub fn batch_plan(&self) -> Option<&BatchPlan> {
        self.plan.as_ref()
    }

    /// Allocates the element-to-node graph of `system` and plans the batches.
    ///
    /// Must be called exactly once, before the first call to [`Self::execute`].
    pub fn initialize_connectivity<M, L>(&mut self, mesh: &M, system: &mut L) -> eyre::Result<()>
    where
        M: MeshPart<T>,
        L: LinearSystem<T>,
    {
        if self.plan.is_some() {
            return Err(eyre!("Connectivity of the algorithm is already initialized"));
        }
        self.check_compatibility(mesh, system)?;

        system
            .build_elem_to_node_graph(mesh)
            .wrap_err("Failed to build the element-to-node graph")?;
        let plan = BatchPlan::new(mesh, self.config.simd_width);
        debug!(
            "Planned {} elements of {:?} in {} batches of width {} and {} colors",
            plan.num_elements(),
            self.signature,
            plan.batches().len(),
            plan.width(),
            plan.colors().len()
        );
        self.plan = Some(plan);
        Ok(())
    }

    /// Runs every kernel over every element and adds the local systems to `system`.
    pub fn execute<M, L>(&mut self, mesh: &M, system: &mut L, time: &TimeIntegrator<T>) -> eyre::Result<AssemblyReport>
    where
        M: MeshPart<T>,
        L: LinearSystem<T>,
    {
        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| eyre!("Connectivity must be initialized before executing the algorithm"))?;
        self.check_compatibility(mesh, system)?;
        if plan.num_elements() != mesh.num_elements() {
            return Err(eyre!(
                "Mesh has {} elements, but connectivity was initialized for {}",
                mesh.num_elements(),
                plan.num_elements()
            ));
        }
        self.check_fields(mesh)?;
        for kernel in &mut self.kernels {
            kernel
                .setup(time)
                .wrap_err("Failed to set up a kernel for the assembly pass")?;
        }

        let access = system.scatter_access();
        let mut report = AssemblyReport {
            num_batches: plan.batches().len(),
            num_colors: plan.colors().len(),
            ..AssemblyReport::default()
        };

        for (color_index, color) in plan.colors().iter().enumerate() {
            trace!("Assembling color {} with {} batches", color_index, color.len());
            let process = |&batch: &usize| self.process_batch(mesh, &access, plan.batches()[batch].clone());
            let outcomes: Vec<BatchOutcome> = if self.config.parallel {
                color.par_iter().map(process).collect::<eyre::Result<_>>()?
            } else {
                color.iter().map(process).collect::<eyre::Result<_>>()?
            };
            for outcome in outcomes {
                report.num_scattered_elements += outcome.num_scattered;
                report.degenerate_elements.extend(outcome.degenerate);
            }
        }
        report.degenerate_elements.sort_unstable();

        if !report.degenerate_elements.is_empty() {
            warn!(
                "{} element(s) with degenerate Jacobian in {:?} assembly of \"{}\"",
                report.degenerate_elements.len(),
                self.config.degenerate_element_policy,
                self.equation.dof_name
            );
        }
        Ok(report)
    }

    fn process_batch<M, S>(&self, mesh: &M, access: &S, elements: std::ops::Range<usize>) -> eyre::Result<BatchOutcome>
    where
        M: MeshPart<T>,
        S: ScatterAdd<T>,
    {
        let ws = &mut *self
            .workspace
            .get_or(|| {
                RefCell::new(BatchWorkspace::new(
                    Arc::clone(&self.scv),
                    Arc::clone(&self.scs),
                    self.config.simd_width,
                ))
            })
            .borrow_mut();

        let ndof = self.equation.dofs_per_node;
        let degenerate_lanes = ws.gather(mesh, elements.clone(), &self.requests, ndof)?;
        let degenerate: Vec<usize> = degenerate_lanes.iter().map(|&lane| elements.start + lane).collect();

        let policy = self.config.degenerate_element_policy;
        if !degenerate.is_empty() {
            if policy == DegenerateElementPolicy::Abort {
                return Err(eyre!("Degenerate Jacobian in element(s) {:?}", degenerate));
            }
            debug!("Degenerate Jacobian in element(s) {:?}", degenerate);
        }

        for kernel in &self.kernels {
            kernel.execute(&mut ws.lhs, &mut ws.rhs, &ws.scratch);
        }

        let mut num_scattered = 0;
        for (lane, element) in elements.enumerate() {
            if policy == DegenerateElementPolicy::Skip && degenerate_lanes.binary_search(&lane).is_ok() {
                continue;
            }

            let nodes = mesh.element_nodes(element);
            extract_matrix_lane(&ws.lhs, lane, &mut ws.local_lhs);
            ws.local_rhs.resize(ws.rhs.len(), T::zero());
            extract_vector_lane(&ws.rhs, lane, &mut ws.local_rhs);
            self.relaxation.apply(&mut ws.local_lhs);

            ws.sort_permutation.clear();
            ws.sort_permutation.extend(0..nodes.len());
            ws.sort_permutation.sort_by_key(|&i| nodes[i]);

            // Batches processed concurrently belong to the same color and share no node
            unsafe {
                access.sum_into(nodes, &ws.sort_permutation, &ws.local_lhs, &ws.local_rhs);
            }
            num_scattered += 1;
        }

        Ok(BatchOutcome {
            num_scattered,
            degenerate,
        })
    }

    fn check_compatibility<M, L>(&self, mesh: &M, system: &L) -> eyre::Result<()>
    where
        M: MeshPart<T>,
        L: LinearSystem<T>,
    {
        if mesh.signature() != self.signature {
            return Err(eyre!(
                "Mesh has elements of type {:?}, but the algorithm was created for {:?}",
                mesh.signature(),
                self.signature
            ));
        }
        if system.dofs_per_node() != self.equation.dofs_per_node {
            return Err(eyre!(
                "Linear system has {} dofs per node, but equation \"{}\" has {}",
                system.dofs_per_node(),
                self.equation.dof_name,
                self.equation.dofs_per_node
            ));
        }
        Ok(())
    }

    fn check_fields<M: MeshPart<T>>(&self, mesh: &M) -> eyre::Result<()> {
        for request in self.requests.fields() {
            let field = mesh
                .field(&request.name)
                .ok_or_else(|| eyre!("Mesh has no field named \"{}\"", request.name))?;
            if field.num_components() != request.num_components {
                return Err(eyre!(
                    "Field \"{}\" has {} components, but {} were requested",
                    request.name,
                    field.num_components(),
                    request.num_components
                ));
            }
            if field.num_nodes() != mesh.num_nodes() {
                return Err(eyre!(
                    "Field \"{}\" has values for {} nodes, but the mesh has {}",
                    request.name,
                    field.num_nodes(),
                    mesh.num_nodes()
                ));
            }
        }
        Ok(())
    }
}
