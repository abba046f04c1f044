pub mod drafts;
pub mod entities;
pub mod error;
pub mod slug;
