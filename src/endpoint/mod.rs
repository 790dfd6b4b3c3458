//! Backend endpoint management and invocation.
//!
//! # Data Flow
//! ```text
//! Invoker reads the endpoint-override attribute
//!     → managed.rs (criteria: name, api type, required modes)
//!     → pool.rs (load-balanced selection over UP endpoints)
//!     → qos.rs (compatibility negotiation for async connectors)
//!     → connector.connect(ctx)
//! ```
//!
//! # Design Decisions
//! - The pool snapshot is replaced wholesale on redeploy, never mutated
//! - Selection never blocks: readers follow the current snapshot pointer
//! - The QoS matcher is a pure decision procedure

pub mod invoker;
pub mod managed;
pub mod pool;
pub mod qos;

pub use invoker::{EndpointInvoker, Invoker};
pub use managed::{EndpointCriteria, EndpointStatus, ManagedEndpoint};
pub use pool::EndpointPool;
