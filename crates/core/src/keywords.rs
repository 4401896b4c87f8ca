/// A search term as typed by the user plus its case-folded comparison form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    original: String,
    folded: String,
}

impl Keyword {
    /// Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let original = raw.trim();
        if original.is_empty() {
            return None;
        }

        Some(Self {
            original: original.to_string(),
            folded: original.to_lowercase(),
        })
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn occurs_in(&self, lowered_text: &str) -> bool {
        lowered_text.contains(&self.folded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InQuote,
}

/// Splits comma-separated input into keywords. Single or double quotes toggle a phrase
/// mode in which commas are literal; an unterminated quote keeps its content.
pub fn parse_keywords(input: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    let mut current = String::new();
    let mut state = ScanState::Normal;

    for character in input.chars() {
        match (character, state) {
            ('"' | '\'', ScanState::Normal) => state = ScanState::InQuote,
            ('"' | '\'', ScanState::InQuote) => state = ScanState::Normal,
            (',', ScanState::Normal) => {
                push_trimmed(&mut keywords, &current);
                current.clear();
            }
            _ => current.push(character),
        }
    }

    push_trimmed(&mut keywords, &current);
    keywords
}

fn push_trimmed(keywords: &mut Vec<String>, buffer: &str) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        keywords.push(trimmed.to_string());
    }
}
