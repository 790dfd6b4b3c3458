//! Execution hooks.
//!
//! Optional observers wrapped around processor-chain and invoker execution.
//! When tracing is disabled, zero hooks are installed.

use std::sync::Arc;

use crate::reactor::ExecutionPhase;

/// Observer around one chain or invoker execution.
pub trait ChainHook: Send + Sync {
    fn id(&self) -> &str;

    fn on_enter(&self, component_id: &str, phase: Option<ExecutionPhase>);

    fn on_exit(&self, component_id: &str, success: bool);
}

/// Emits trace events around the wrapped component.
pub struct TracingHook {
    component: &'static str,
}

impl TracingHook {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl ChainHook for TracingHook {
    fn id(&self) -> &str {
        self.component
    }

    fn on_enter(&self, component_id: &str, phase: Option<ExecutionPhase>) {
        tracing::trace!(component = self.component, id = component_id, phase = ?phase, "enter");
    }

    fn on_exit(&self, component_id: &str, success: bool) {
        tracing::trace!(component = self.component, id = component_id, success, "exit");
    }
}

/// Run a future between the enter/exit callbacks of every hook.
pub async fn hooked<F, T>(
    hooks: &[Arc<dyn ChainHook>],
    component_id: &str,
    phase: Option<ExecutionPhase>,
    future: F,
) -> Result<T, crate::context::Interruption>
where
    F: std::future::Future<Output = Result<T, crate::context::Interruption>>,
{
    for hook in hooks {
        hook.on_enter(component_id, phase);
    }
    let result = future.await;
    for hook in hooks {
        hook.on_exit(component_id, result.is_ok());
    }
    result
}
