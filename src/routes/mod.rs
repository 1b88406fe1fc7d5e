//! Router Module Index
//!
//! Routes are split by access level; each module's access rule is applied where
//! it is merged in `create_router`.

/// Routes accessible to anonymous callers.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;

/// Routes restricted to the 'admin' role (checked in the handlers).
pub mod admin;
