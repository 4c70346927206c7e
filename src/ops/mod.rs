pub mod board_ops;
pub mod filter;
pub mod schedule;
pub mod task_ops;
