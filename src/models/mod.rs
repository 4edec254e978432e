pub mod application;
pub mod invitation;
pub mod job;
pub mod user;
