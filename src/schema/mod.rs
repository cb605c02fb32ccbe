//! Runtime table metadata: catalog-derived handles and the resolver that builds them.

mod resolver;
mod types;

pub use resolver::TableResolver;
pub use types::*;
