pub mod deployment;
pub mod status;

pub use deployment::*;
pub use status::*;
