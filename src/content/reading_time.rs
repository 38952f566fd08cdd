//! Reading-time estimate for a post

use super::post::Section;

/// Assumed reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Count whitespace-separated words
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Words in every section heading and every body block
pub fn total_words(sections: &[Section]) -> usize {
    sections
        .iter()
        .map(|section| {
            count_words(&section.heading)
                + section
                    .body
                    .iter()
                    .map(|block| count_words(&block.text))
                    .sum::<usize>()
        })
        .sum()
}

/// Minutes needed to read the sections, rounded up.
///
/// Content without words takes zero minutes.
pub fn estimate(sections: &[Section]) -> u32 {
    let minutes = total_words(sections).div_ceil(WORDS_PER_MINUTE);
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
