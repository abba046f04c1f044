//! Admin editor pipeline.
//!
//! Edits flow into an [`AutosaveSession`], which debounces writes to a
//! [`DraftStore`] and throttles, retries and rekeys saves through a
//! [`RemoteSaver`]. Publishing is a separate one-shot call through
//! [`PublishClient`].

pub mod autosave;
pub mod client;
pub mod credentials;
pub mod drafts;
pub mod publish;
pub mod remote;
pub mod schedule;
pub mod status;

pub use autosave::{AutosaveCoordinator, AutosaveSession};
pub use client::{AdminApiClient, ClientSetupError};
pub use credentials::AdminCredentials;
pub use drafts::{DraftStore, DraftStoreError, FsDraftStore, MemoryDraftStore};
pub use publish::{PublishClient, PublishError};
pub use remote::{RemoteSaveClient, RemoteSaveError, RemoteSaved, RemoteSaver};
pub use schedule::AutosavePolicy;
pub use status::SaveStatus;
