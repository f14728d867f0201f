pub mod admin;
pub mod candidate;
pub mod election;
pub mod organization;
pub mod polling;
pub mod voter;
