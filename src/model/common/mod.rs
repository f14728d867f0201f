pub mod candidate;
pub mod election;
pub mod polling;
pub mod time;
