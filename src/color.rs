//! Deterministic user colors.
//!
//! The same user id must render with the same color everywhere, across
//! sessions and across implementations, without any server coordination.
//! The fold below uses wrapping 32-bit signed arithmetic at every step so
//! the result matches any client that hashes with 32-bit integers.

#[cfg(test)]
#[path = "color_test.rs"]
mod tests;

/// Fixed display palette. Collisions between different ids are expected
/// and fine; stability per id is the only requirement.
pub const PALETTE: [&str; 10] = [
    "#e57373", "#64b5f6", "#81c784", "#ffb74d", "#ba68c8",
    "#4dd0e1", "#f06292", "#a1887f", "#9575cd", "#4db6ac",
];

/// Derive a stable palette color from a user id.
///
/// Folds the id's UTF-16 code units into a 32-bit signed accumulator with
/// `acc = (acc * 31 - acc) + code`, truncated to 32 bits at every step,
/// then indexes the palette by `|acc| mod len`. No hash seeding, no
/// cryptographic property.
#[must_use]
pub fn color_for(user_id: &str) -> &'static str {
    let mut acc: i32 = 0;
    for code in user_id.encode_utf16() {
        acc = acc
            .wrapping_mul(31)
            .wrapping_sub(acc)
            .wrapping_add(i32::from(code));
    }
    let index = acc.unsigned_abs() as usize % PALETTE.len();
    PALETTE[index]
}
