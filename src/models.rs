pub mod store;
pub mod tags;
pub mod task;
