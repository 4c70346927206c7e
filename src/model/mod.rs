pub mod config;
pub mod intent;
pub mod query;
pub mod task;

pub use config::*;
pub use intent::*;
pub use query::*;
pub use task::*;
