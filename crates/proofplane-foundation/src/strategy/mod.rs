//! Strategy catalog, selection and the published plan.

pub mod catalog;
pub mod plan_cell;
pub mod selector;

pub use catalog::{StrategyCatalog, optimizations_for};
pub use plan_cell::PlanCell;
pub use selector::{AdaptationThresholds, StrategySelector};
