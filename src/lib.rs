//! Slot-based timetable optimization.
//!
//! Places tasks onto (resource, time bucket) slots so that hard
//! constraints hold and soft preferences are met where possible, using
//! greedy construction followed by an aging-weighted local search with
//! shuffle-kicks.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Problem`, `Resource`, `Task`, `Slot`,
//!   `Placement`, `Assignment`, `Schedule`, `Move`
//! - **`evaluator`**: Constraint catalogue and cost breakdown
//! - **`moves`**: Feasible reassign, swap, and shuffle-kick proposals
//! - **`optimizer`**: Construction, acceptance, search loop, monitors
//! - **`codec`**: TOML schedule files
//! - **`validation`**: Input integrity checks (duplicate IDs, references, ranges)
//! - **`kpi`**: Schedule quality metrics
//! - **`session`**: Process-wide schedule state with a one-run-at-a-time policy
//! - **`commands`**: `select_file` / `optimize_schedule` / `download_file`
//!
//! # Example
//!
//! ```
//! use u_timetable::Session;
//!
//! let file = br#"
//! horizon = 2
//! [[resources]]
//! id = "room"
//! [[tasks]]
//! id = "math"
//! [[tasks]]
//! id = "art"
//! "#;
//!
//! let session = Session::new();
//! session.select_file(file).unwrap();
//! let cost = session.optimize_schedule(1.0, true, true).unwrap();
//! assert_eq!(cost, 0);
//! let bytes = session.download_file().unwrap();
//! assert!(!bytes.is_empty());
//! ```
//!
//! # References
//!
//! - Kirkpatrick et al. (1983), "Optimization by Simulated Annealing"
//! - Lourenço et al. (2003), "Iterated Local Search"
//! - Schaerf (1999), "A Survey of Automated Timetabling"

pub mod codec;
pub mod commands;
pub mod error;
pub mod evaluator;
pub mod kpi;
pub mod models;
pub mod moves;
pub mod optimizer;
pub mod session;
pub mod validation;

pub use error::{Error, MoveError, Result};
pub use evaluator::{ConstraintEvaluator, ConstraintKind, Cost, CostBreakdown, Violation};
pub use optimizer::{OptimizationResult, Optimizer, OptimizerConfig, TerminationReason};
pub use session::Session;
