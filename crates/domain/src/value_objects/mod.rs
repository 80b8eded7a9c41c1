//! Value objects: validated, immutable values with no identity.

mod api_key;
mod names;

pub use api_key::ApiKey;
pub use names::normalize_world_name;
