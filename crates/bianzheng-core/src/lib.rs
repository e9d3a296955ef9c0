pub mod catalog;
pub mod config;
pub mod element;
pub mod error;
pub mod loader;
pub mod logging;
pub mod pattern;
pub mod registry;
pub mod source;
pub mod types;
pub mod validation;

pub use catalog::*;
pub use config::*;
pub use element::SyndromeElement;
pub use error::*;
pub use loader::*;
pub use logging::*;
pub use pattern::*;
pub use registry::*;
pub use source::*;
pub use types::*;
pub use validation::*;
