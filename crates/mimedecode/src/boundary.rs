//! Splitting multipart bodies on their boundary delimiter.

/// Strips the doubled quoting some mailers leave around a boundary value,
/// e.g. `\"abc\"` or `""abc""`.
fn unwrap_double_quoted(boundary: &str) -> &str {
    ["\\\"", "\"\""]
        .iter()
        .find_map(|wrap| {
            boundary
                .strip_prefix(wrap)
                .and_then(|inner| inner.strip_suffix(wrap))
        })
        .unwrap_or(boundary)
}

/// Splits a multipart body into its raw parts.
///
/// The body is cut at every delimiter: `--<boundary>` followed by
/// whitespace, or `--<boundary>--`. The segment before the first delimiter
/// (preamble) is dropped, as is any segment that is only whitespace. The
/// segment after the last delimiter is kept unless it starts with `-`. Each
/// returned part starts with the line break that followed its delimiter and
/// still holds its own header block.
///
/// A body without any delimiter yields no parts.
#[must_use]
pub fn split_parts<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{}", unwrap_double_quoted(boundary));
    let mut segments = Vec::new();
    let mut segment_start = 0;
    let mut search_from = 0;

    while let Some(offset) = body[search_from..].find(&delimiter) {
        let at = search_from + offset;
        let after = at + delimiter.len();
        let rest = &body[after..];

        let next_start = if rest.starts_with("--") {
            after + 2
        } else if rest.starts_with(char::is_whitespace) {
            after
        } else {
            // The delimiter starts with ASCII '-', so `at + 1` is a char boundary.
            search_from = at + 1;
            continue;
        };

        segments.push(&body[segment_start..at]);
        segment_start = next_start;
        search_from = next_start;
    }

    if segments.is_empty() {
        tracing::trace!("no boundary delimiter in multipart body");
        return Vec::new();
    }

    let mut parts = Vec::new();
    for segment in segments.into_iter().skip(1) {
        push_non_blank(&mut parts, segment);
    }
    let last = &body[segment_start..];
    if !last.starts_with('-') {
        push_non_blank(&mut parts, last);
    }

    tracing::trace!(count = parts.len(), "split multipart body");
    parts
}

fn push_non_blank<'a>(parts: &mut Vec<&'a str>, part: &'a str) {
    if !part.trim().is_empty() {
        parts.push(part);
    }
}
