#![deny(clippy::all, clippy::pedantic)]

pub mod articles;
pub mod drafts;
pub mod publish;
