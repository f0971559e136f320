pub mod messages;
pub mod stats;
pub mod types;

pub use messages::*;
pub use stats::*;
pub use types::*;
