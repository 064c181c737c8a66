//! Extraction of structured payloads embedded in free-form model replies

/// Return the first balanced brace-delimited block in `text`, if any.
///
/// Model replies often wrap the requested JSON in prose or code fences.
/// This scans from the first `{`, tracking brace nesting and string
/// escapes, and stops at the matching `}`. The caller decides what to do
/// when no block exists or the block fails to parse.
pub fn first_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
