//! Canonical node identifiers.
//!
//! Every code path that turns model-supplied text into a graph key goes through
//! [`canonical_id`], so logically identical inputs always land on the same node.
//!
//! Rules, applied in order:
//! 1. trim surrounding whitespace (so `"Step One "` gives `step_one`, not
//!    `step_one_`)
//! 2. insert `_` at each lowercase-to-uppercase letter boundary (`stepOne` -> `step_One`)
//! 3. lowercase
//! 4. replace each run of whitespace with a single `_`
//! 5. drop every character outside `[a-z0-9_-]`
//!
//! If step 5 empties the id (e.g. one written entirely in a non-Latin script)
//! the step 4 result is returned instead; callers detect this with
//! [`is_canonical_id`].

/// Normalize a raw identifier. Returns `None` for ids that are empty after
/// trimming. The leading trim is applied on top of the whitespace rule.
#[must_use]
pub fn canonical_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut separated = String::with_capacity(trimmed.len() + 4);
    let mut previous_lower = false;
    for ch in trimmed.chars() {
        if previous_lower && ch.is_uppercase() {
            separated.push('_');
        }
        previous_lower = ch.is_lowercase();
        separated.push(ch);
    }

    let lowered = separated.to_lowercase();

    let mut underscored = String::with_capacity(lowered.len());
    let mut in_whitespace = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                underscored.push('_');
            }
            in_whitespace = true;
        } else {
            in_whitespace = false;
            underscored.push(ch);
        }
    }

    let stripped: String = underscored
        .chars()
        .filter(|ch| is_id_char(*ch))
        .collect();

    if stripped.is_empty() {
        Some(underscored)
    } else {
        Some(stripped)
    }
}

/// True when `id` is non-empty and made only of `[a-z0-9_-]`.
#[must_use]
pub fn is_canonical_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(is_id_char)
}

const fn is_id_char(ch: char) -> bool {
    matches!(ch, 'a'..='z' | '0'..='9' | '_' | '-')
}
