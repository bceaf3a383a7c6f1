//! Credential secrets and the paired access/refresh record kept by the store.

pub mod pair;
pub mod secret;
