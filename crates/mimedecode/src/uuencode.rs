//! Extraction of legacy uuencoded blocks from message bodies.
//!
//! A block looks like:
//!
//! ```text
//! begin 644 file.txt
//! <encoded lines>
//! end
//! ```
//!
//! Malformed lines are decoded as far as they go; nothing here fails.

/// A file recovered from a uuencoded block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuFile {
    /// File name from the `begin` line.
    pub filename: String,
    /// Unix permission bits from the `begin` line.
    pub permissions: u32,
    /// Decoded contents.
    pub data: Vec<u8>,
}

/// Finds and decodes every uuencoded block in `input`.
#[must_use]
pub fn uudecode(input: &str) -> Vec<UuFile> {
    let mut files = Vec::new();
    let mut search_from = 0;

    while let Some(offset) = input[search_from..].find("begin ") {
        let at = search_from + offset;
        match parse_block(input, at + "begin ".len()) {
            Some((file, end)) => {
                tracing::debug!(filename = %file.filename, size = file.data.len(), "uudecoded file");
                files.push(file);
                search_from = end;
            }
            None => search_from = at + 1,
        }
    }

    files
}

/// Parses `<perm> <name>\n<data>\nend` starting right after `begin `.
///
/// Returns the file and the offset just past `end`.
fn parse_block(input: &str, start: usize) -> Option<(UuFile, usize)> {
    let header = input.as_bytes().get(start..start + 4)?;
    if header[3] != b' ' || !header[..3].iter().all(|b| (b'0'..=b'7').contains(b)) {
        return None;
    }
    let permissions = u32::from_str_radix(&input[start..start + 3], 8).ok()?;

    let name_start = start + 4;
    let name_line_end = name_start + input[name_start..].find('\n')?;
    let filename = input[name_start..name_line_end].trim_end_matches('\r');
    if filename.is_empty() {
        return None;
    }

    let data_start = name_line_end + 1;
    // The data must hold at least one character before the terminating line.
    let search = data_start + 1;
    let end_at = search + input.get(search..)?.find("\nend")?;
    let data = &input[data_start..end_at];
    let data = data.strip_suffix('\r').unwrap_or(data);

    let mut bytes = Vec::new();
    for line in data.trim().split('\n') {
        decode_line(line.trim_end_matches('\r').as_bytes(), &mut bytes);
    }

    let file = UuFile {
        filename: filename.to_string(),
        permissions,
        data: bytes,
    };
    Some((file, end_at + "\nend".len()))
}

/// Six-bit value of an encoded character.
const fn sixbit(byte: u8) -> u8 {
    (byte ^ 0x20) & 0x3f
}

/// Decodes one encoded line, stopping once its declared length is reached.
fn decode_line(line: &[u8], out: &mut Vec<u8>) {
    let Some(&first) = line.first() else {
        return;
    };
    let len = usize::from(first.wrapping_sub(b' ') & 0x3f);
    let at = |i: usize| sixbit(line[i]);

    let mut pos = 1;
    let mut done = 0;
    while done + 3 <= len && pos + 4 <= line.len() {
        let (c0, c1, c2, c3) = (at(pos), at(pos + 1), at(pos + 2), at(pos + 3));
        out.extend([(c0 << 2) | (c1 >> 4), (c1 << 4) | (c2 >> 2), (c2 << 6) | c3]);
        pos += 4;
        done += 3;
    }

    if done + 2 <= len && pos + 3 <= line.len() {
        let (c0, c1, c2) = (at(pos), at(pos + 1), at(pos + 2));
        out.extend([(c0 << 2) | (c1 >> 4), (c1 << 4) | (c2 >> 2)]);
        pos += 3;
        done += 2;
    }

    if done < len && pos + 2 <= line.len() {
        let (c0, c1) = (at(pos), at(pos + 1));
        out.push((c0 << 2) | (c1 >> 4));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block() {
        let body = "Some text\r\n\r\nbegin 644 cat.txt\r\n#0V%T\r\n`\r\nend\r\nTrailer";
        let files = uudecode(body);
        assert_eq!(
            files,
            vec![UuFile {
                filename: "cat.txt".to_string(),
                permissions: 0o644,
                data: b"Cat".to_vec(),
            }]
        );
    }

    #[test]
    fn test_partial_final_group() {
        let body = "begin 600 hello.txt\n-2&5L;&\\L(%=O<FQD(0  \n`\nend\n";
        let files = uudecode(body);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].data, b"Hello, World!");
        assert_eq!(files[0].permissions, 0o600);

        let files = uudecode("begin 644 ab\n\"86( \nend");
        assert_eq!(files[0].data, b"ab");
    }

    #[test]
    fn test_multiple_blocks() {
        let body = "begin 644 a\n#0V%T\nend\nmiddle\nbegin 755 b\n\"86( \nend\n";
        let files = uudecode(body);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].filename, "a");
        assert_eq!(files[0].data, b"Cat");
        assert_eq!(files[1].filename, "b");
        assert_eq!(files[1].permissions, 0o755);
        assert_eq!(files[1].data, b"ab");
    }

    #[test]
    fn test_rejects_bad_begin_lines() {
        assert!(uudecode("begin 888 x\n#0V%T\nend").is_empty());
        assert!(uudecode("begin 64 x\n#0V%T\nend").is_empty());
        assert!(uudecode("begin 644 x\n#0V%T\n").is_empty());
        assert!(uudecode("no blocks here").is_empty());
    }

    #[test]
    fn test_truncated_line_is_decoded_partially() {
        // Declares 3 bytes but only carries enough characters for one.
        let files = uudecode("begin 644 t\n#0V\nend");
        assert_eq!(files[0].data, b"C");
    }
}
