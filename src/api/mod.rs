pub mod binder;
pub mod extractor;
pub mod handlers;
pub mod routes;

pub use binder::*;
pub use extractor::*;
pub use routes::*;
