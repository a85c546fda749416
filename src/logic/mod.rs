pub mod inflect;
pub mod matcher;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod route_params;

pub use matcher::*;
pub use orchestrator::*;
pub use registry::*;
pub use resolver::{find_relation, resolve_model, LookupStrategy};
pub use route_params::*;
