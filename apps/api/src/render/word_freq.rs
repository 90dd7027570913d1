//! Word counting for the skill cloud.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Upper bound on words drawn in one cloud.
pub const MAX_WORDS: usize = 200;

/// Common English words that never make it into the cloud.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "can't", "cannot", "com", "could", "couldn't", "did", "didn't",
    "do", "does", "doesn't", "doing", "don't", "down", "during", "each", "else", "ever", "few",
    "for", "from", "further", "get", "had", "hadn't", "has", "hasn't", "have", "haven't",
    "having", "he", "he'd", "he'll", "he's", "hence", "her", "here", "here's", "hers", "herself",
    "him", "himself", "his", "how", "how's", "however", "http", "i", "i'd", "i'll", "i'm",
    "i've", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself", "just", "k",
    "let's", "like", "me", "more", "most", "mustn't", "my", "myself", "no", "nor", "not", "of",
    "off", "on", "once", "only", "or", "other", "otherwise", "ought", "our", "ours",
    "ourselves", "out", "over", "own", "r", "same", "shall", "shan't", "she", "she'd",
    "she'll", "she's", "should", "shouldn't", "since", "so", "some", "such", "than", "that",
    "that's", "the", "their", "theirs", "them", "themselves", "then", "there", "there's",
    "therefore", "these", "they", "they'd", "they'll", "they're", "they've", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "wasn't", "we", "we'd",
    "we'll", "we're", "we've", "were", "weren't", "what", "what's", "when", "when's", "where",
    "where's", "which", "while", "who", "who's", "whom", "why", "why's", "with", "won't",
    "would", "wouldn't", "www", "you", "you'd", "you'll", "you're", "you've", "your", "yours",
    "yourself", "yourselves",
];

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w[\w']+").expect("static regex is valid"))
}

fn is_stopword(lower: &str) -> bool {
    STOPWORDS.binary_search(&lower).is_ok()
}

/// A word and how often it occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// Counts words of two or more characters, ignoring case, stopwords and pure
/// numbers. Each entry is displayed with its most frequent original spelling.
/// Sorted by count (descending), then alphabetically; at most `MAX_WORDS`.
pub fn word_frequencies(text: &str) -> Vec<WordCount> {
    // lower-case key -> (total, spelling -> count)
    let mut groups: HashMap<String, (usize, HashMap<&str, usize>)> = HashMap::new();

    for m in token_regex().find_iter(text) {
        let mut token = m.as_str();
        if let Some(stripped) = token.strip_suffix("'s").or_else(|| token.strip_suffix("'S")) {
            token = stripped;
        }
        let token = token.trim_end_matches('\'');
        if token.chars().count() < 2 || token.chars().all(|c| c.is_numeric()) {
            continue;
        }
        let lower = token.to_lowercase();
        if is_stopword(&lower) {
            continue;
        }
        let entry = groups.entry(lower).or_default();
        entry.0 += 1;
        *entry.1.entry(token).or_default() += 1;
    }

    let mut counts: Vec<WordCount> = groups
        .into_values()
        .map(|(count, spellings)| {
            let word = spellings
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(spelling, _)| spelling.to_string())
                .unwrap_or_default();
            WordCount { word, count }
        })
        .collect();

    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    counts.truncate(MAX_WORDS);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwords_are_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn test_counts_ignore_case_and_stopwords() {
        let counts = word_frequencies("Rust and rust and RUST with Go. The Go team");
        assert_eq!(counts[0].count, 3);
        assert_eq!(counts[0].word.to_lowercase(), "rust");
        assert_eq!(counts[1], WordCount { word: "Go".to_string(), count: 2 });
        assert!(counts.iter().all(|c| !is_stopword(&c.word.to_lowercase())));
    }

    #[test]
    fn test_most_common_spelling_wins() {
        let counts = word_frequencies("Kubernetes kubernetes Kubernetes");
        assert_eq!(counts, vec![WordCount { word: "Kubernetes".to_string(), count: 3 }]);
    }

    #[test]
    fn test_drops_numbers_and_single_letters() {
        let counts = word_frequencies("2019 2020 C x Python3 v2");
        let words: Vec<_> = counts.iter().map(|c| c.word.as_str()).collect();
        assert_eq!(words, vec!["Python3", "v2"]);
    }

    #[test]
    fn test_possessive_suffix_is_removed() {
        let counts = word_frequencies("Google's cloud, Google search");
        assert_eq!(counts[0], WordCount { word: "Google".to_string(), count: 2 });
    }

    #[test]
    fn test_empty_and_stopword_only_text() {
        assert!(word_frequencies("").is_empty());
        assert!(word_frequencies("the and of to").is_empty());
    }

    #[test]
    fn test_output_is_capped() {
        let text = (0..500).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        assert_eq!(word_frequencies(&text).len(), MAX_WORDS);
    }
}
