//! Quire: a sectioned publishing API and the admin editor pipeline that feeds it.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod editor;
pub mod infra;
pub(crate) mod util;
