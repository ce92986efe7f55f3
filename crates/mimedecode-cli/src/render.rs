//! Text rendering of decoded messages.

use std::fmt::Write as _;

use mimedecode::{MailDecoder, MimeNode, Part, UuFile};

/// Renders the main headers and an outline of the part tree.
pub fn summary(decoder: &dyn MailDecoder) -> mimedecode::Result<String> {
    let fields = [
        ("From", decoder.from()?),
        ("To", decoder.to()?),
        ("Subject", decoder.subject()?),
        ("Date", decoder.date()?),
        ("Message-ID", decoder.message_id()?),
        ("Content-Type", decoder.content_type()?),
        ("Charset", decoder.character_set()?),
    ];

    let mut out = String::new();
    for (label, value) in fields.iter().filter(|(_, value)| !value.is_empty()) {
        let _ = writeln!(out, "{label}: {value}");
    }
    out.push('\n');
    let node = decoder.structure().ok_or(mimedecode::Error::NotParsed)?;
    outline(node, 0, &mut out);
    Ok(out)
}

fn outline(node: &MimeNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = write!(out, "{indent}{}", node.content_type.mime_type());
    if let Some(disposition) = &node.disposition {
        let _ = write!(out, " [{disposition}]");
    }
    if let Some(name) = node
        .disposition_parameters
        .get("filename")
        .or_else(|| node.content_type.parameters.get("name"))
    {
        let _ = write!(out, " \"{name}\"");
    }
    if let Some(body) = &node.body {
        let _ = write!(out, " ({} bytes)", body.len());
    }
    out.push('\n');

    for part in node.parts() {
        match part {
            Part::Node(child) => outline(child, depth + 1, out),
            Part::Failed { error } => {
                let _ = writeln!(out, "{indent}  ! {error}");
            }
        }
    }
}

/// Renders one line per uuencoded file.
pub fn uuencoded(files: &[UuFile]) -> String {
    files.iter().fold(String::new(), |mut out, file| {
        let _ = writeln!(
            out,
            "{:03o} {} ({} bytes)",
            file.permissions,
            file.filename,
            file.data.len()
        );
        out
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mimedecode::MimeDecoder;

    #[test]
    fn test_summary_outline() {
        let mut decoder = MimeDecoder::new();
        decoder
            .parse(concat!(
                "From: a@example.com\n",
                "Subject: Report\n",
                "Content-Type: multipart/mixed; boundary=b\n",
                "\n",
                "--b\n",
                "\n",
                "hello\n",
                "--b\n",
                "Content-Type: application/pdf; name=r.pdf\n",
                "Content-Disposition: attachment\n",
                "\n",
                "%PDF\n",
                "--b\n",
                "Content-Type: multipart/alternative\n",
                "\n",
                "x\n",
                "--b--\n"
            ))
            .unwrap();

        let text = summary(&decoder).unwrap();
        assert_eq!(
            text,
            concat!(
                "From: a@example.com\n",
                "Subject: Report\n",
                "Content-Type: multipart/mixed; boundary=b\n",
                "\n",
                "multipart/mixed\n",
                "  text/plain (6 bytes)\n",
                "  application/pdf [attachment] \"r.pdf\" (5 bytes)\n",
                "  ! No boundary found for multipart/alternative part\n"
            )
        );
    }

    #[test]
    fn test_summary_requires_parse() {
        let decoder = MimeDecoder::new();
        assert!(summary(&decoder).is_err());
    }

    #[test]
    fn test_uuencoded_listing() {
        let files = vec![UuFile {
            filename: "cat.txt".to_string(),
            permissions: 0o644,
            data: b"Cat".to_vec(),
        }];
        assert_eq!(uuencoded(&files), "644 cat.txt (3 bytes)\n");
    }
}
