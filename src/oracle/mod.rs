//! Remote-side resolution through the build oracle and its auxiliary sources.
mod client;
mod extract;
mod link;
mod rating;
mod resolve;

pub use client::{CommandOracle, Oracle, ID_PLACEHOLDER};
pub use link::{LinkLookup, TemplateLink};
pub use rating::{HttpRatingSource, RatingSource};
pub use resolve::Resolver;
