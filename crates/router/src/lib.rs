//! Route-level authorization for the admin console
//!
//! A [`RouteTable`] describes the application's pages and their
//! [`RouteMeta`]; the [`RouteGuard`] decides, from a session snapshot alone,
//! whether a navigation may proceed; the [`Router`] applies those decisions
//! and tracks the current location.

mod error;
mod guard;
mod route;
mod router;

pub use error::RouterError;
pub use guard::{GuardDecision, Notice, NoticeLevel, RouteGuard};
pub use route::{ResolvedRoute, RouteMeta, RouteRecord, RouteTable};
pub use router::{Navigation, Router};

pub type Result<T> = std::result::Result<T, RouterError>;
