pub mod task_ops;
pub mod task_store;
