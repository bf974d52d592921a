//! Places
//!
//! Burger places: storage in [`Places`] and JSON:API handlers mounted with
//! [`routes`].
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .nest("/places", places::routes())
//!     .with_state(app_state);
//!
//! let lib = places::Places::new(connection);
//! let place = lib.get_place(1).await?;
//! ```

mod handler;
mod lib;
mod routes;

pub use lib::*;

pub use routes::routes;
