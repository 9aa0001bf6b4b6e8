/// Router Module Index
///
/// Routing is split by trust model rather than by feature, so every route's gate
/// is visible from the module it lives in.

/// Routes open to anyone: health checks and the audience-aware menu.
pub mod public;

/// Portal pages. Every path runs through the page gate (`AccessEngine`).
pub mod pages;

/// Machine-to-machine API under `/api`, behind the role-gated endpoint guard.
pub mod api;
