//! API gateway execution core.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                  API GATEWAY                      │
//!                    │                                                   │
//!   Client Request   │  ┌──────────┐   ┌──────────┐   ┌──────────────┐  │
//!   ─────────────────┼─▶│entrypoint│──▶│ reactor  │──▶│  security    │  │
//!                    │  │connector │   │ (phases) │   │  plan chain  │  │
//!                    │  └──────────┘   └────┬─────┘   └──────┬───────┘  │
//!                    │                      │                │          │
//!                    │                      ▼                ▼          │
//!                    │               ┌──────────────┐ ┌─────────────┐   │
//!                    │               │ flow chains  │ │subscription │   │
//!                    │               │ (plan/api)   │ │  resolver   │   │
//!                    │               └──────┬───────┘ └─────────────┘   │
//!                    │                      ▼                           │
//!   Client Response  │  ┌──────────┐  ┌──────────┐   ┌──────────────┐  │
//!   ◀────────────────┼──│processor │◀─│ endpoint │──▶│   endpoint   │──┼──▶ Backend
//!                    │  │  chains  │  │ invoker  │   │  pool + QoS  │  │
//!                    │  └──────────┘  └──────────┘   └──────────────┘  │
//!                    │                                                  │
//!                    │  ┌────────────────────────────────────────────┐  │
//!                    │  │            Cross-Cutting Concerns           │  │
//!                    │  │  config · plugin registry · observability   │  │
//!                    │  │  lifecycle · template engine · tcp tunnel   │  │
//!                    │  └────────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod connector;
pub mod context;
pub mod definition;
pub mod endpoint;
pub mod reactor;

// Access control
pub mod security;
pub mod subscription;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod plugin;
pub mod template;

pub use config::GatewayConfig;
pub use context::{ExecutionContext, ExecutionFailure, Interruption};
pub use lifecycle::Shutdown;
pub use reactor::ApiReactor;
