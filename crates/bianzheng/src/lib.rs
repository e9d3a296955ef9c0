pub mod knowledge_base;

pub use knowledge_base::*;

pub use bianzheng_core;
pub use bianzheng_graph;
pub use bianzheng_match;
