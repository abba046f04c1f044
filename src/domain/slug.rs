//! Utilities for generating deterministic, human-friendly article slugs.
//!
//! Slug generation stays pure: callers pass a uniqueness predicate that checks
//! their own persistence, and the helpers retry with numeric suffixes.

use std::future::Future;

use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

/// Base slug used when a title has nothing slugifiable in it (autosaved drafts
/// frequently start out with an empty title).
pub const FALLBACK_SLUG: &str = "untitled";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

/// Errors that can occur while generating a slug via an async uniqueness check.
#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from a title, falling back to [`FALLBACK_SLUG`].
pub fn derive_slug(title: &str) -> String {
    let candidate = slugify(title.trim());
    if candidate.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        candidate
    }
}

/// Produce a slug that the async predicate reports as unused.
///
/// The predicate returns `true` when the candidate is free. Collisions are
/// retried as `base-2`, `base-3`, … up to a fixed number of attempts.
pub async fn generate_unique_slug_async<F, Fut, E>(
    title: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(title);

    if is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::convert::Infallible;

    use super::*;

    #[test]
    fn derive_slug_lowercases_and_hyphenates() {
        assert_eq!(derive_slug("  Hello, World!  "), "hello-world");
    }

    #[test]
    fn derive_slug_falls_back_for_blank_titles() {
        assert_eq!(derive_slug(""), FALLBACK_SLUG);
        assert_eq!(derive_slug("   "), FALLBACK_SLUG);
        assert_eq!(derive_slug("!!!"), FALLBACK_SLUG);
    }

    #[tokio::test]
    async fn unique_slug_appends_counter_on_collision() {
        let taken: HashSet<&str> = ["field-notes", "field-notes-2"].into_iter().collect();
        let slug = generate_unique_slug_async("Field Notes", |candidate| {
            let free = !taken.contains(candidate);
            async move { Ok::<_, Infallible>(free) }
        })
        .await
        .expect("unique slug");

        assert_eq!(slug, "field-notes-3");
    }

    #[tokio::test]
    async fn unique_slug_gives_up_after_bounded_attempts() {
        let result = generate_unique_slug_async("Busy", |_| async { Ok::<_, Infallible>(false) }).await;

        assert!(matches!(
            result,
            Err(SlugAsyncError::Slug(SlugError::Exhausted { ref base })) if base == "busy"
        ));
    }
}
