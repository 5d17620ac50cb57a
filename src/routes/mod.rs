//! Router Module Index
//!
//! Routes are split by who may call them. Access control is attached per module
//! with a route layer in `create_router`, never inside handlers.

/// Anonymous, read-only content plus login and diagnostics.
pub mod public;

/// Content administration, behind the staff gate (admin or superadmin).
pub mod admin;

/// Staff account management, behind the superadmin gate.
pub mod superadmin;
