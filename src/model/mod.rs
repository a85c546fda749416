pub mod bindable;
pub mod blog;
pub mod context;
pub mod descriptor;
pub mod slot;

pub use bindable::*;
pub use blog::*;
pub use context::*;
pub use descriptor::*;
pub use slot::*;
