// Output-format strategies for merged trust material.

mod keystore;
mod pem_bundle;

pub use keystore::*;
pub use pem_bundle::*;
