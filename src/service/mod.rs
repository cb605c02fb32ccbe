//! TableAccessor: generic CRUD over any resolved table using the parametrized SQL builder.

mod crud;
mod validation;
pub use crud::TableAccessor;
pub use validation::{RequestValidator, ID_FIELD};
