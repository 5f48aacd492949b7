pub mod common_steps;
pub mod filter_steps;
pub mod task_steps;
pub mod web_steps;
