//! Safe SQL builder: identifiers from catalog metadata or quoted, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
