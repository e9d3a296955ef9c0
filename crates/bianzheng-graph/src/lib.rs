pub mod builder;
pub mod graph;
pub mod index;
pub mod layout;
pub mod model;

pub use builder::GraphBuilder;
pub use graph::*;
pub use index::*;
pub use layout::{Position, SeverityTiers};
pub use model::*;
