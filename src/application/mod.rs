pub mod articles;
pub mod error;
pub mod public;
pub mod repos;
