//! Shared guardrails for name lengths, result counts and batch sizes.

use crate::errors::{MatchError, MatchResult};

pub const MAX_NAME_LENGTH: usize = 512;
pub const MAX_SEARCH_LIMIT: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_BATCH_SIZE: usize = 10_000;

pub fn clamp_int(value: i64, minimum: i64, maximum: i64) -> i64 {
    value.max(minimum).min(maximum)
}

pub fn clamp_limit(value: usize) -> usize {
    clamp_int(value as i64, 1, MAX_SEARCH_LIMIT as i64) as usize
}

/// Trim and cut `name` to at most [`MAX_NAME_LENGTH`] bytes on a char
/// boundary.
pub fn truncate_name(name: &str) -> String {
    let stripped = name.trim();
    if stripped.len() <= MAX_NAME_LENGTH {
        return stripped.to_string();
    }
    let mut end = MAX_NAME_LENGTH;
    while !stripped.is_char_boundary(end) {
        end -= 1;
    }
    stripped[..end].to_string()
}

pub fn check_batch_size(len: usize) -> MatchResult<()> {
    if len > MAX_BATCH_SIZE {
        return Err(MatchError::InvalidInput(format!(
            "batch of {len} requests exceeds the limit of {MAX_BATCH_SIZE}"
        )));
    }
    Ok(())
}
