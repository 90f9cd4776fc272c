//! Whitespace-insensitive text replacement

use regex::{NoExpand, Regex};

/// Build a pattern matching `needle` with any run of whitespace standing in
/// for any other. `None` when the needle is blank.
pub fn whitespace_pattern(needle: &str) -> Result<Option<Regex>, regex::Error> {
    let words: Vec<String> = needle.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return Ok(None);
    }
    Regex::new(&words.join(r"\s+")).map(Some)
}

/// Replace every occurrence of `old` in `content` with `new` taken literally.
///
/// Returns the new content and the number of replacements.
pub fn replace_ignoring_whitespace(
    content: &str,
    old: &str,
    new: &str,
) -> Result<(String, usize), regex::Error> {
    let Some(pattern) = whitespace_pattern(old)? else {
        return Ok((content.to_string(), 0));
    };

    let count = pattern.find_iter(content).count();
    if count == 0 {
        return Ok((content.to_string(), 0));
    }
    Ok((pattern.replace_all(content, NoExpand(new)).into_owned(), count))
}
