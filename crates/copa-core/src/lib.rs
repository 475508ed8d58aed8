//! # copa-core: Cloud Allocation Domain Model
//!
//! Fundamental data structures for the COPA planner: applications, instance
//! classes with their pricing regimes, limiting sets with aggregate capacity
//! caps, performance tables and workload forecasts, all bundled into an
//! immutable [`Problem`].
//!
//! ## Quick Start
//!
//! ```rust
//! use copa_core::*;
//!
//! let mut perf = PerformanceSet::new("perf", TimeUnit::Hour);
//! perf.set("small", "web", 100.0);
//!
//! let problem = Problem::new(
//!     "p0",
//!     "one app, one class",
//!     vec![Workload::new("w0", App::new("web", "web"), TimeUnit::Hour, vec![250, 310, 190])],
//!     vec![InstanceClass::new("small", "small", 0.05, TimeUnit::Hour, false)
//!         .with_limiting_sets(["region"])],
//!     vec![LimitingSet::new("region", "region").with_max_vms(40)],
//!     perf,
//! );
//! assert!(problem.validate().is_ok());
//! ```
//!
//! Solvers live in `copa-algo`; document I/O lives in `copa-io`.

pub mod error;
pub mod model;
pub mod units;

pub use error::{CopaError, CopaResult};
pub use model::{App, InstanceClass, LimitingSet, PerformanceSet, Problem, Workload};
pub use units::TimeUnit;
