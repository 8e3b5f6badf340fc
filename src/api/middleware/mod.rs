//! API middleware stack.
//!
//! Execution order (outermost → innermost) on protected routes:
//! 1. Auth validator: token validation, injects `AuthUser`
//! 2. Audit logger: logs after auth, knows the caller

pub mod audit;
pub mod auth;
