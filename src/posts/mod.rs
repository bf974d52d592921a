//! Posts: the review feed, grouped by day and then by item.

mod handler;
mod lib;
mod routes;

pub use lib::*;

pub use routes::routes;
