//! Plan-based request authentication.
//!
//! # Data Flow
//! ```text
//! Request enters the reactor:
//!     → chain.rs (ordered handlers, one per plan)
//!     → handler.rs (mechanism match, selection rule, subscription pre-check)
//!     → jwt.rs (token payload inspection for client identification)
//!     → Matched plan's security policies execute with substituted config
//! ```

pub mod chain;
pub mod handler;
pub mod jwt;

pub use chain::{SecurityChain, PLAN_UNRESOLVABLE_KEY};
pub use handler::{PlanSecurityHandler, SecurityPolicy, API_KEY_HEADER, API_KEY_PARAM};
