pub mod config_io;
pub mod memory_service;
pub mod recovery;
pub mod service;
pub mod store_io;
