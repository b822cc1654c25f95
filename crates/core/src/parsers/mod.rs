pub mod validate;

use thiserror::Error;

use crate::model::Profile;

pub use validate::{ValidationError, validate_profile};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid profile: {0}")]
    Invalid(#[from] ValidationError),
}

/// Parse a processed profile from JSON and check its internal references.
///
/// Derived columns that are not serialized (stack depths) are rebuilt here,
/// so the returned profile is ready for the call tree and sanitizer.
pub fn parse_profile(data: &[u8]) -> Result<Profile, ParseError> {
    let mut profile: Profile = serde_json::from_slice(data)?;
    for (thread_index, thread) in profile.threads.iter_mut().enumerate() {
        thread
            .stack_table
            .recompute_depth()
            .map_err(|stack_index| ValidationError::StackPrefixOrder {
                thread_index,
                stack_index,
            })?;
    }
    validate_profile(&profile)?;
    tracing::debug!(
        threads = profile.threads.len(),
        counters = profile.counters.len(),
        pages = profile.pages.len(),
        "parsed profile"
    );
    Ok(profile)
}

/// The JSON byte snapshot handed to an upload transport.
pub fn serialize_profile(profile: &Profile) -> Result<Vec<u8>, ParseError> {
    Ok(serde_json::to_vec(profile)?)
}
