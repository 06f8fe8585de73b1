//! Concurrent batch execution with failure bisection
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │        Harness          │
//!                     │  - BatchPlanner         │
//!                     │  - waits on PendingWork │
//!                     └───────────┬─────────────┘
//!                                 │ kickoff (count, then enqueue)
//!                                 ▼
//!                     ┌─────────────────────────┐
//!                     │       WorkQueue         │◄──────────────┐
//!                     │  (crossbeam unbounded)  │               │
//!                     └───────────┬─────────────┘               │
//!       ┌─────────────────────────┼─────────────────────────┐   │ bisect:
//!       │                         │                         │   │ singletons
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼───┴─┐
//! │  Worker 1 │             │  Worker 2 │             │  Worker N │
//! │  run      │             │  run      │             │  run      │
//! │  classify │             │  classify │             │  classify │
//! │  judge    │             │  judge    │             │  judge    │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └─────────────────────────┼─────────────────────────┘
//!                                 ▼
//!                     ┌─────────────────────────┐
//!                     │  Reporter + RunStats    │
//!                     └─────────────────────────┘
//! ```

pub mod bisect;
pub mod coordinator;
pub mod queue;
pub mod worker;

pub use bisect::{judge, Verdict};
pub use coordinator::{Harness, HarnessProgress, HarnessResult};
pub use queue::{FlagSet, PendingWork, WorkItem, WorkQueue};
pub use worker::{RunStats, StatsSnapshot};
