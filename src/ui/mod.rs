//! Terminal presentation: landing page and conversation view

pub mod conversation;
pub mod landing;

pub use conversation::{ConversationAction, ConversationManager};
pub use landing::LandingPage;

/// Wrap text to fit within the given width.
///
/// Explicit newlines are kept, blank lines included. Words longer than the
/// width are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();

            if current_len > 0 && current_len + 1 + word_len <= width {
                current_line.push(' ');
                current_line.push_str(word);
                current_len += 1 + word_len;
                continue;
            }

            if current_len > 0 {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }

            if word_len <= width {
                current_line.push_str(word);
                current_len = word_len;
            } else {
                let chars: Vec<char> = word.chars().collect();
                let mut pieces = chars.chunks(width).peekable();
                while let Some(piece) = pieces.next() {
                    let piece: String = piece.iter().collect();
                    if pieces.peek().is_some() {
                        lines.push(piece);
                    } else {
                        current_len = piece.chars().count();
                        current_line = piece;
                    }
                }
            }
        }

        lines.push(current_line);
    }

    lines
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn keeps_paragraphs() {
        assert_eq!(wrap_text("one\n\ntwo", 20), vec!["one", "", "two"]);
    }

    #[test]
    fn splits_long_words() {
        assert_eq!(wrap_text("abcdefghij xy", 4), vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(wrap_text("धर्म धर्म", 4), vec!["धर्म", "धर्म"]);
    }
}
