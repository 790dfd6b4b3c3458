//! Plugin contracts and deploy-time dependency resolution.
//!
//! # Data Flow
//! ```text
//! Api definition deployed:
//!     → dependency.rs (collect every (category, identifier) the API needs)
//!     → registry.rs (check each against what is loadable)
//!     → Deploy proceeds, or the missing set is reported
//! ```
//!
//! # Design Decisions
//! - Policy content is out of scope; the gateway only knows the `Policy`
//!   execution contract
//! - Dependency discovery and flow execution share the same enabled-step
//!   filter, so a skipped policy can never show up in an executed chain

pub mod dependency;
pub mod registry;

use async_trait::async_trait;

use crate::context::{ExecutionContext, PhaseResult};

pub use dependency::{resolve_dependencies, PluginCategory, PluginDependency};
pub use registry::PluginRegistry;

/// Execution contract of a policy plugin.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Plugin identifier, as referenced by flow steps.
    fn id(&self) -> &str;

    /// REQUEST-leg execution.
    async fn on_request(&self, _ctx: &mut ExecutionContext) -> PhaseResult {
        Ok(())
    }

    /// RESPONSE-leg execution.
    async fn on_response(&self, _ctx: &mut ExecutionContext) -> PhaseResult {
        Ok(())
    }
}
