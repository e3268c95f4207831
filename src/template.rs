//! Inline templating for header and footer fragments.
//!
//! A fragment ends up inside a double-quoted literal of the layout script.
//! Text between `@{{` and `}}` is spliced in as a script expression, so
//! `Page @{{numPage}}` becomes `Page " + numPage + "`.

/// Opens an embedded script expression.
pub const OPEN_DELIMITER: &str = "@{{";
/// Closes an embedded script expression.
pub const CLOSE_DELIMITER: &str = "}}";

/// Turns a header/footer fragment into the body of a double-quoted script literal.
///
/// Double quotes become single quotes and whitespace runs collapse to one
/// space. No other escaping is done; callers sanitize HTML themselves.
pub fn process(fragment: &str) -> String {
    let unquoted = fragment.replace('"', "'");
    let spliced = unquoted
        .replace(OPEN_DELIMITER, "\" + ")
        .replace(CLOSE_DELIMITER, " + \"");
    compact(&spliced)
}

/// Collapses every whitespace run (newlines included) to a single space.
pub fn compact(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
