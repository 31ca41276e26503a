//! Term weighting for the name word cloud.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

/// English stop-words (the NLTK list).
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

fn word_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Two or more word characters, like a default TF-IDF vectoriser.
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("static regex"))
}

/// Drop English stop-words, keeping the remaining words in order.
pub fn remove_stopwords(text: &str) -> String {
    let stop = stopwords();
    text.split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '\'' && c != '-'))
        .filter(|w| !w.is_empty() && !stop.contains(w.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokenize(text: &str) -> Vec<String> {
    word_pattern()
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Summed TF-IDF weight of every term across `documents`, heaviest first.
///
/// Raw term counts, smoothed idf `ln((1 + n) / (1 + df)) + 1`, each document
/// L2-normalised before summing. Ties are ordered alphabetically and the
/// result is capped at `max_terms`.
pub fn tfidf_weights<S: AsRef<str>>(documents: &[S], max_terms: usize) -> Vec<(String, f64)> {
    let docs: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();
    let n = docs.len() as f64;

    let mut df: BTreeMap<&str, usize> = BTreeMap::new();
    for doc in &docs {
        let unique: HashSet<&str> = doc.iter().map(String::as_str).collect();
        for term in unique {
            *df.entry(term).or_default() += 1;
        }
    }
    let idf: BTreeMap<&str, f64> = df
        .iter()
        .map(|(term, &d)| (*term, ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0))
        .collect();

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for doc in &docs {
        let mut tf: BTreeMap<&str, f64> = BTreeMap::new();
        for term in doc {
            *tf.entry(term.as_str()).or_default() += 1.0;
        }
        let weighted: Vec<(&str, f64)> = tf
            .into_iter()
            .map(|(term, count)| (term, count * idf.get(term).copied().unwrap_or(1.0)))
            .collect();
        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            continue;
        }
        for (term, w) in weighted {
            *totals.entry(term.to_string()).or_default() += w / norm;
        }
    }

    let mut out: Vec<(String, f64)> = totals.into_iter().collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1));
    out.truncate(max_terms);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwords_are_removed_case_insensitively() {
        assert_eq!(remove_stopwords("The Exploitation of Remote Services"), "Exploitation Remote Services");
        assert_eq!(remove_stopwords("of the and"), "");
    }

    #[test]
    fn single_document_weights_are_unit_normalised() {
        let weights = tfidf_weights(&["credential dumping"], 10);
        assert_eq!(weights.len(), 2);
        let sum_sq: f64 = weights.iter().map(|(_, w)| w * w).sum();
        assert!((sum_sq - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rare_terms_outweigh_common_ones_within_a_document() {
        let docs = ["process injection", "process discovery", "process hollowing"];
        let weights: BTreeMap<String, f64> = tfidf_weights(&docs, 10).into_iter().collect();
        // `process` appears in every document, so each occurrence is cheap,
        // but it still sums across three documents.
        assert!(weights["injection"] > weights["process"] / 3.0);
        assert!(weights.contains_key("hollowing"));
    }

    #[test]
    fn short_tokens_and_empty_documents_are_ignored() {
        let weights = tfidf_weights(&["a b", ""], 10);
        assert!(weights.is_empty());
    }

    #[test]
    fn empty_documents_count_towards_idf() {
        let weights: BTreeMap<String, f64> = tfidf_weights(&["", "alpha beta", "alpha gamma"], 10)
            .into_iter()
            .collect();
        assert!((weights["alpha"] - 1.2108).abs() < 1e-3);
        assert!((weights["beta"] - 0.7959).abs() < 1e-3);
    }

    #[test]
    fn output_is_capped() {
        let weights = tfidf_weights(&["one two three four five"], 3);
        assert_eq!(weights.len(), 3);
    }
}
