pub mod stopwatch;
pub mod tracker;
pub mod views;
