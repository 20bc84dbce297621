//! Describe JSON shapes once, then validate requests, serialize responses
//! and document both as OpenAPI components.
//!
//! - [`node`], [`parser`], [`compiler`]: type descriptions compiled into
//!   `components.schemas`.
//! - [`input`]: validators that collect every problem into a [`report::Report`].
//! - [`output`], [`blueprint`]: serializers with named views.
//! - [`params`]: object schemas projected onto path/query parameters.
pub mod blueprint;
pub mod compiler;
pub mod error;
pub mod input;
pub mod node;
pub mod output;
pub mod params;
pub mod parser;
pub mod path_de;
pub mod report;
pub mod schema;
