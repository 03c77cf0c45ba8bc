/// Decode `%XX` escapes in a URL path.
///
/// Invalid escapes are kept verbatim and invalid UTF-8 is replaced, so any
/// input decodes to something.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// `two-fer` -> `two_fer`
pub fn snake_case(slug: &str) -> String {
    slug.replace('-', "_")
}

/// `two-fer` -> `TwoFer`
pub fn pascal_case(slug: &str) -> String {
    slug.split('-').map(capitalize).collect()
}

/// `two-fer` -> `twofer`
pub fn flat_case(slug: &str) -> String {
    slug.replace('-', "")
}

/// `two-fer` -> `Twofer`
pub fn capitalized_flat_case(slug: &str) -> String {
    capitalize(&flat_case(slug))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Levenshtein edit distance, counted in chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }

    // Single rolling row over `b`
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_decode_handles_valid_and_broken_escapes() {
        assert_eq!(percent_decode("/ruby/two%20fer"), "/ruby/two fer");
        assert_eq!(percent_decode("caf%C3%A9"), "café");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz%4"), "%zz%4");
    }

    #[test]
    fn slug_casings() {
        assert_eq!(snake_case("rna-transcription"), "rna_transcription");
        assert_eq!(pascal_case("rna-transcription"), "RnaTranscription");
        assert_eq!(flat_case("rna-transcription"), "rnatranscription");
        assert_eq!(capitalized_flat_case("rna-transcription"), "Rnatranscription");
        assert_eq!(pascal_case("leap"), "Leap");
        assert_eq!(pascal_case("a--b"), "AB");
    }

    #[test]
    fn edit_distance_matches_known_values() {
        assert_eq!(edit_distance("recursion", "recursions"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }
}
