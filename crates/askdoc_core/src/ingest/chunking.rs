pub const DEFAULT_CHUNK_MAX_CHARS: usize = 1000;

/// Collapse every whitespace run (newlines included) to a single space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split after `.`, `!` or `?` when the terminator is followed by whitespace.
///
/// Expects whitespace-normalized input, so the separator is always a single space.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut prev: Option<char> = None;
    for (i, ch) in text.char_indices() {
        if ch == ' ' && matches!(prev, Some('.') | Some('!') | Some('?')) {
            let s = text[start..i].trim();
            if !s.is_empty() {
                out.push(s);
            }
            start = i + 1;
        }
        prev = Some(ch);
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

fn hard_split(sentence: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Pack sentences greedily into chunks of at most `max_chars` characters.
///
/// Sentences are joined with a single space. A sentence longer than `max_chars` on its
/// own is split at character boundaries. Output chunks never contain newlines.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for sentence in split_sentences(&normalized) {
        let sentence_chars = sentence.chars().count();
        if sentence_chars > max_chars {
            if !buf.is_empty() {
                out.push(std::mem::take(&mut buf));
                buf_chars = 0;
            }
            out.extend(hard_split(sentence, max_chars));
            continue;
        }

        let add = if buf.is_empty() {
            sentence_chars
        } else {
            sentence_chars + 1
        };
        if !buf.is_empty() && buf_chars + add > max_chars {
            out.push(std::mem::take(&mut buf));
            buf_chars = 0;
        }
        if !buf.is_empty() {
            buf.push(' ');
            buf_chars += 1;
        }
        buf.push_str(sentence);
        buf_chars += sentence_chars;
    }
    if !buf.is_empty() {
        out.push(buf);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_on_sentence_terminators_followed_by_space() {
        assert_eq!(
            split_sentences("One. Two! Three? v1.2 stays"),
            vec!["One.", "Two!", "Three?", "v1.2 stays"]
        );
    }

    #[test]
    fn packs_sentences_up_to_limit() {
        let text = "Alpha beta. Gamma delta.\n\nEpsilon zeta.";
        assert_eq!(
            chunk_text(text, 24),
            vec!["Alpha beta. Gamma delta.", "Epsilon zeta."]
        );
        assert_eq!(
            chunk_text(text, 1000),
            vec!["Alpha beta. Gamma delta. Epsilon zeta."]
        );
    }

    #[test]
    fn hard_splits_oversized_sentences_on_char_boundaries() {
        let text = "é".repeat(25);
        let chunks = chunk_text(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn blank_input_yields_no_chunks() {
        assert!(chunk_text(" \n\t ", 100).is_empty());
    }
}
