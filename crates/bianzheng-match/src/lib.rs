pub mod matcher;
pub mod selection;

pub use matcher::*;
pub use selection::*;
