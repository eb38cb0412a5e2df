//! Panel queries
//!
//! Entry point used by the rendering layer: a panel request in, a flat
//! series list out.

mod error;
mod orchestrator;

pub use error::{PanelError, PanelResult};
pub use orchestrator::{
    correct_first_points, plan_panel, PanelPlan, PanelQueryRunner, PanelRequest,
};
