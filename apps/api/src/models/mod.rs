pub mod candidate;
pub mod job;
pub mod page;
pub mod score;
