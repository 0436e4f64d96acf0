pub mod body;
pub mod cli;
pub mod element;
pub mod environment;
pub mod error;
pub mod fsutil;
pub mod project;
pub mod record;
pub mod resolver;

pub use body::{Body, BodyKind, BodyRecord, ElementCreation, Relation};
pub use element::{Checkout, Element, ElementRecord, Publish};
pub use environment::{Context, Environment};
pub use error::{PipelineError, Result};
pub use project::Project;
pub use record::{RecordError, RecordStore, TomlFileStore};
pub use resolver::ReferenceResolver;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
