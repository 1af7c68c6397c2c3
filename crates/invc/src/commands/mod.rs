//! Command implementations.

pub mod analyze;
pub mod doctor;
pub mod launch;
pub mod results;

use crate::config::Config;
use invc_core::Dashboard;
use tokio::runtime::Handle;

/// Dashboard wired to the configured tools and result root.
pub fn dashboard(config: &Config) -> Dashboard {
    Dashboard::new(config.tool_registry(), config.result_store(), Handle::current())
}
