/// Display name -> safe filename / URL segment
///
/// This is the only place names are sanitized. Thumbnail paths on disk and the
/// URLs written to the catalog both go through `sanitize`, so they can never
/// disagree.

/// Characters that are illegal in Windows filenames, plus `#` (URL fragment)
const RESERVED: [char; 10] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*', '#'];

/// Longest sanitized name, in characters
const MAX_LEN: usize = 200;

pub fn is_reserved(c: char) -> bool {
    RESERVED.contains(&c)
}

/// Sanitize a display name.
///
/// Reserved characters and whitespace become `_`, runs of `_` collapse to one,
/// the result is cut to 200 characters and stripped of leading/trailing `_`.
///
/// Whitespace is replaced too, so gallery URLs never contain spaces
/// (`Falcon Town Elder` -> `Falcon_Town_Elder.jpg`). Thumbnails written under
/// the raw name are moved by the legacy migration, not matched here.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = false;

    for c in name.chars() {
        let c = if is_reserved(c) || c.is_whitespace() { '_' } else { c };
        if c == '_' {
            if last_underscore {
                continue;
            }
            last_underscore = true;
        } else {
            last_underscore = false;
        }
        out.push(c);
    }

    let truncated: String = out.chars().take(MAX_LEN).collect();
    truncated.trim_matches('_').to_string()
}
