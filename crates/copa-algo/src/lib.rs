//! # copa-algo: Two-Phase Allocation Solvers
//!
//! Cost-minimizing VM allocation over a workload forecast, split into two
//! phases around one reservation decision:
//!
//! 1. **Reservation phase** ([`PhaseI`]): a single MILP over the whole
//!    horizon decides how many reserved VMs of each class to keep running.
//!    The horizon is collapsed into its [`LoadHistogram`], so the model
//!    scales with the number of distinct workload tuples.
//! 2. **Timeslot phase** ([`PhaseII`]): one small MILP per timeslot picks
//!    the on-demand complement around the now-fixed reservations, with a
//!    memoization cache across repeated tuples and a performance-maximising
//!    fallback for slots that cannot be served in full.
//!
//! Formulations target the abstract [`milp::MilpModel`]; any engine
//! implementing [`milp::backend::MilpBackend`] can solve them. The default
//! engine is bundled HiGHS (feature `solver-highs`, enabled by default).
//!
//! ```no_run
//! use copa_algo::{milp::highs::HighsBackend, workload_tuples, PhaseI, PhaseII};
//! # fn problem() -> copa_core::Problem { unimplemented!() }
//!
//! let problem = problem();
//! let backend = HighsBackend::new();
//! let reservation = PhaseI::new(&problem, &backend)?.solve()?;
//! let mut timeslots = PhaseII::new(&problem, &backend, &reservation)?;
//! let period = timeslots.solve_period(workload_tuples(&problem))?;
//! println!("{:?}", period.global_solving_stats);
//! # Ok::<(), copa_core::CopaError>(())
//! ```

mod formulation;
pub mod histogram;
pub mod milp;
mod orchestrator;
pub mod phase1;
pub mod phase2;
pub mod solution;
pub mod test_utils;

pub use histogram::{gcd_rescale, LoadHistogram};
pub use milp::backend::{
    BackendError, BackendSolution, BackendStatus, MilpBackend, SolverConfig,
};
pub use phase1::{PhaseI, ALGORITHM_NAME};
pub use phase2::{workload_tuples, PhaseII, TimeslotSolution};
pub use solution::{
    AllocationInfo, AlgorithmInfo, GlobalSolvingStats, ReservedAllocation, SolutionI, SolutionII,
    SolvingStats, Status,
};
