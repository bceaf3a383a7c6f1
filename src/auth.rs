//! Account identifiers and the access/refresh credential model.

pub mod id;
pub mod token;

pub use id::*;
pub use token::{pair::*, secret::*};
