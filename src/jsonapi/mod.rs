//! JSON:API response formatting
//!
//! Turns whatever a handler produces into a JSON:API document and makes sure
//! error responses leave the service in the same shape.
//!
//! # Pieces
//!
//! - [`schema`] validates a candidate document and reports violations
//! - [`serializer`] turns records into `data` resources
//! - [`Formatter`] merges meta, pagination and links, then validates
//! - [`middleware::envelope`] assigns request ids and rewrites faults
//!
//! # Usage
//!
//! ```rust,ignore
//! use burger::jsonapi::{FormatOptions, Payload};
//!
//! async fn list(State(state): State<AppState>, ctx: RequestContext, page: PageParams) -> Result<JsonApi, Fault> {
//!     let rows = load_rows(page.limit(), page.offset()).await.map_err(Fault::internal)?;
//!     let options = FormatOptions::default().with_pagination(page.context(rows.count));
//!     Ok(state.jsonapi.format(&ctx, Payload::models(&rows.rows)?, options)?)
//! }
//! ```

pub mod context;
pub mod document;
pub mod formatter;
pub mod middleware;
pub mod pagination;
pub mod schema;
pub mod serializer;

pub use context::RequestContext;
pub use document::{Document, MEDIA_TYPE};
pub use formatter::{FormatOptions, Formatter, JsonApi, JsonApiConfig, Payload, ValidationMode};
pub use pagination::{PageParams, PaginationContext};
pub use serializer::JsonApiModel;
