pub mod backends;
pub mod build;
pub mod extract;
pub mod history;
pub mod project;
pub mod targets;
pub mod util;

pub use backends::*;
pub use build::*;
pub use extract::*;
pub use history::*;
pub use project::*;
pub use targets::*;
pub use util::*;
