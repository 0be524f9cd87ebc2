//! Executing navigation plans against a device

pub mod collaborators;
pub mod executor;
pub mod position;
pub mod simulated;

pub use collaborators::{
    ActionBatchResult, ActionExecutor, VerificationBatchResult, VerificationExecutor,
};
pub use executor::{NavigationExecutor, NavigationPlan, NavigationResult};
pub use position::{Position, PositionTracker};
pub use simulated::SimulatedDevice;
