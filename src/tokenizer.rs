//! Splits raw text into terms and quote-group boundaries (spec §4.2).
//!
//! Case folding is deliberately narrow: ASCII lower-casing plus a fixed
//! allowlist of three extended letters (å, ä, ö). This is not general
//! Unicode case folding and is not meant to be (spec §1 Non-goals).

const QUOTE: char = '"';

/// The result of tokenizing one piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tokenized {
    /// Tokens in original order, original or lower case depending on the
    /// caller's request.
    pub words: Vec<String>,
    /// Positions (indices into `words`) of quote markers, in the order they
    /// appeared. Pair-wise, `quotes[2i]..quotes[2i+1]` delimits a phrase.
    pub quotes: Vec<usize>,
}

impl Tokenized {
    /// Quoted ranges as `[start, end)` pairs, dropping a trailing unpaired
    /// quote mark. This is the open question flagged in spec §9: the
    /// tokenizer itself does not reject odd quote counts, the evaluator just
    /// ignores the leftover one.
    pub fn quote_ranges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.quotes.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Positions covered by any quoted range.
    pub fn quoted_positions(&self) -> std::collections::HashSet<usize> {
        self.quote_ranges().flat_map(|(a, b)| a..b).collect()
    }
}

fn is_allowed_letter(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, 'å' | 'ä' | 'ö' | 'Å' | 'Ä' | 'Ö')
}

/// Lower-case a single character per the crate's narrow allowlist, leaving
/// anything else (including other Unicode) untouched.
fn lower_char(c: char) -> char {
    match c {
        'Å' => 'å',
        'Ä' => 'ä',
        'Ö' => 'ö',
        c if c.is_ascii_uppercase() => c.to_ascii_lowercase(),
        c => c,
    }
}

/// Lower-case a whole string using [`lower_char`].
pub fn ascii_lower(s: &str) -> String {
    s.chars().map(lower_char).collect()
}

/// Tokenize `text`, optionally lower-casing kept words.
///
/// `words` always contains every kept token regardless of stop-word status;
/// stop-word filtering is a separate step applied by the indexer and query
/// evaluator (spec §4.2 implementation note), because the tokenizer's output
/// also drives snippet context which needs every original word.
pub fn tokenize(text: &str, lower_case: bool) -> Tokenized {
    // Step 1 + 2: replace disallowed characters with a space, then pad quote
    // marks with extra spaces so `"hello` splits into `"` and `hello`.
    let mut normalized = String::with_capacity(text.len());
    for c in text.chars() {
        if c == QUOTE {
            normalized.push(' ');
            normalized.push(QUOTE);
            normalized.push(' ');
        } else if is_allowed_letter(c) || c.is_whitespace() {
            normalized.push(c);
        } else {
            normalized.push(' ');
        }
    }

    // Step 3 + 4: split on whitespace, strip any residual disallowed bytes
    // from each piece (a no-op after step 1/2, kept as a safeguard).
    let pieces = normalized.split_whitespace().map(|piece| {
        piece
            .trim_matches(|c: char| !is_allowed_letter(c) && c != QUOTE)
            .to_string()
    });

    // Step 5 + 6: drop empties, and track quote markers against the running
    // index of kept non-quote tokens.
    let mut words = Vec::new();
    let mut quotes = Vec::new();
    for piece in pieces.filter(|p| !p.is_empty()) {
        if piece == "\"" {
            quotes.push(words.len());
        } else if lower_case {
            words.push(ascii_lower(&piece));
        } else {
            words.push(piece);
        }
    }

    Tokenized { words, quotes }
}

/// A term is a stop-word iff it is shorter than two characters or is present
/// in `stop_words` (which callers must already have lower-cased).
pub fn is_stop_word(term: &str, stop_words: &std::collections::BTreeSet<String>) -> bool {
    term.chars().count() < 2 || stop_words.contains(term)
}
