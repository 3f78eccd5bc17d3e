//! Request routing.
//!
//! A fixed, ordered table maps method and path to one of the built-in
//! handlers; the first matching entry wins.

pub mod router;

pub use router::{Handler, PathMatcher, ROUTES, Route, Router, match_route};
