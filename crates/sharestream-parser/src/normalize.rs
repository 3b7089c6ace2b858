//! Name normalization shared by grouping, naming and cover queries.

/// Lowercase, replace every non-alphanumeric run with one space, trim.
///
/// ```
/// use sharestream_parser::normalize::normalize;
///
/// assert_eq!(normalize("Breaking.Bad_(2008)"), "breaking bad 2008");
/// assert_eq!(normalize("  Foo  "), "foo");
/// ```
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}

/// Normalized name with spaces replaced by underscores, for file names.
///
/// Empty names become `untitled`.
///
/// ```
/// use sharestream_parser::normalize::slug;
///
/// assert_eq!(slug("The Office (US)"), "the_office_us");
/// assert_eq!(slug("!!!"), "untitled");
/// ```
pub fn slug(raw: &str) -> String {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        "untitled".to_string()
    } else {
        normalized.replace(' ', "_")
    }
}

/// Split a share-relative or absolute path into non-empty segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

/// File name without its extension.
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Turn a file stem into a display title: separators become spaces and
/// leading ordering markers (`[2]`, `02 -`) are dropped.
///
/// ```
/// use sharestream_parser::normalize::display_title;
///
/// assert_eq!(display_title("[2] The.Two.Towers"), "The Two Towers");
/// assert_eq!(display_title("03 - Return"), "Return");
/// assert_eq!(display_title("2001.A.Space.Odyssey"), "2001 A Space Odyssey");
/// ```
pub fn display_title(stem: &str) -> String {
    let spaced: String = stem
        .chars()
        .map(|c| if c == '.' || c == '_' { ' ' } else { c })
        .collect();
    let mut rest = spaced.trim();

    if let Some(after) = rest.strip_prefix('[') {
        if let Some((inner, tail)) = after.split_once(']') {
            if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                rest = tail.trim_start();
            }
        }
    }

    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if (1..=3).contains(&digits) {
        let tail = &rest[digits..];
        if let Some(stripped) = tail.strip_prefix([' ', '-']) {
            let stripped = stripped.trim_start_matches([' ', '-']);
            if !stripped.is_empty() {
                rest = stripped;
            }
        }
    }

    let title = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        spaced.trim().to_string()
    } else {
        title
    }
}
