//! Hook plumbing shared by generated hook traits
//!
//! Each generated message gets its own `<Message>Hooks` trait whose methods
//! all default to no-ops. Overriding a method is how a hook is made present.

use crate::error::BoxError;

/// Result returned by every hook method.
pub type HookResult = Result<(), BoxError>;

/// Hook implementation that overrides nothing.
///
/// Every generated hook trait is implemented for `NoHooks`, so it can be passed
/// to any generated operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;
