//! Document-term counting and tf-idf weighting.
//!
//! The tokenizer keeps runs of two or more word characters, lowercases them,
//! drops stop words and then forms n-grams joined by a single space. The
//! vocabulary is sorted lexicographically so column indices are stable.

use crate::sparse::CsrMatrix;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextError {
    #[error("Invalid n-gram range ({min}, {max})")]
    InvalidNgramRange { min: usize, max: usize },

    #[error("Token pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}

pub type TextResult<T> = Result<T, TextError>;

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all",
    "almost", "alone", "along", "already", "also", "although", "always", "am", "among",
    "amongst", "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone",
    "anything", "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became",
    "because", "become", "becomes", "becoming", "been", "before", "beforehand", "behind",
    "being", "below", "beside", "besides", "between", "beyond", "bill", "both", "bottom",
    "but", "by", "call", "can", "cannot", "cant", "co", "con", "could", "couldnt", "cry",
    "de", "describe", "detail", "do", "done", "down", "due", "during", "each", "eg",
    "eight", "either", "eleven", "else", "elsewhere", "empty", "enough", "etc", "even",
    "ever", "every", "everyone", "everything", "everywhere", "except", "few", "fifteen",
    "fifty", "fill", "find", "fire", "first", "five", "for", "former", "formerly", "forty",
    "found", "four", "from", "front", "full", "further", "get", "give", "go", "had", "has",
    "hasnt", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein",
    "hereupon", "hers", "herself", "him", "himself", "his", "how", "however", "hundred",
    "i", "ie", "if", "in", "inc", "indeed", "interest", "into", "is", "it", "its", "itself",
    "keep", "last", "latter", "latterly", "least", "less", "ltd", "made", "many", "may",
    "me", "meanwhile", "might", "mill", "mine", "more", "moreover", "most", "mostly",
    "move", "much", "must", "my", "myself", "name", "namely", "neither", "never",
    "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto",
    "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own",
    "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem",
    "seemed", "seeming", "seems", "serious", "several", "she", "should", "show", "side",
    "since", "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something",
    "sometime", "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than",
    "that", "the", "their", "them", "themselves", "then", "thence", "there", "thereafter",
    "thereby", "therefore", "therein", "thereupon", "these", "they", "thick", "thin",
    "third", "this", "those", "though", "three", "through", "throughout", "thru", "thus",
    "to", "together", "too", "top", "toward", "towards", "twelve", "twenty", "two", "un",
    "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well", "were",
    "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
    "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither",
    "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without",
    "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// Stop words removed before n-grams are formed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopWords {
    None,
    English,
    Custom(Vec<String>),
}

impl Default for StopWords {
    fn default() -> Self {
        StopWords::English
    }
}

impl StopWords {
    fn to_set(&self) -> HashSet<String> {
        match self {
            StopWords::None => HashSet::new(),
            StopWords::English => ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            StopWords::Custom(words) => words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CountVectorizer {
    pub stop_words: StopWords,
    pub ngram_range: (usize, usize),
    pub lowercase: bool,
}

impl Default for CountVectorizer {
    fn default() -> Self {
        Self {
            stop_words: StopWords::English,
            ngram_range: (1, 1),
            lowercase: true,
        }
    }
}

impl CountVectorizer {
    pub fn new(stop_words: StopWords, ngram_range: (usize, usize)) -> Self {
        Self { stop_words, ngram_range, ..Default::default() }
    }

    /// Split one document into its n-gram terms
    fn analyze(&self, pattern: &Regex, stop: &HashSet<String>, text: &str) -> Vec<String> {
        let text = if self.lowercase { text.to_lowercase() } else { text.to_string() };
        let tokens: Vec<&str> = pattern
            .find_iter(&text)
            .map(|m| m.as_str())
            .filter(|t| !stop.contains(*t))
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    /// Count terms per document. Returns the `documents × terms` matrix and
    /// the sorted vocabulary; a corpus with no terms gives zero columns.
    pub fn fit_transform<S: AsRef<str>>(&self, texts: &[S]) -> TextResult<(CsrMatrix, Vec<String>)> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(TextError::InvalidNgramRange { min: min_n, max: max_n });
        }

        let pattern = Regex::new(r"\b\w\w+\b")?;
        let stop = self.stop_words.to_set();

        let docs: Vec<Vec<String>> = texts
            .iter()
            .map(|t| self.analyze(&pattern, &stop, t.as_ref()))
            .collect();

        let mut vocab: BTreeMap<&str, usize> = BTreeMap::new();
        for term in docs.iter().flatten() {
            vocab.entry(term.as_str()).or_insert(0);
        }
        for (i, v) in vocab.values_mut().enumerate() {
            *v = i;
        }

        let mut rows = Vec::new();
        let mut cols = Vec::new();
        for (r, doc) in docs.iter().enumerate() {
            for term in doc {
                rows.push(r);
                cols.push(vocab[term.as_str()]);
            }
        }

        let matrix = CsrMatrix::from_triplets(&rows, &cols, None, (texts.len(), vocab.len()));
        let vocabulary = vocab.keys().map(|k| k.to_string()).collect::<Vec<_>>();
        log::debug!(
            "Vectorized {} documents into {} terms ({} non-zeros)",
            texts.len(),
            vocabulary.len(),
            matrix.nnz()
        );
        Ok((matrix, vocabulary))
    }
}

/// Smoothed tf-idf with L2 row normalization
#[derive(Debug, Clone, Copy)]
pub struct TfidfTransformer {
    pub smooth_idf: bool,
    pub sublinear_tf: bool,
}

impl Default for TfidfTransformer {
    fn default() -> Self {
        Self { smooth_idf: true, sublinear_tf: false }
    }
}

impl TfidfTransformer {
    /// Inverse document frequency per column, counting every row as a document
    pub fn idf(&self, counts: &CsrMatrix) -> Vec<f64> {
        let (n_rows, n_cols) = counts.shape();
        let mut df = vec![0usize; n_cols];
        for &c in counts.indices() {
            df[c] += 1;
        }
        let offset = if self.smooth_idf { 1.0 } else { 0.0 };
        let n = n_rows as f64 + offset;
        df.iter().map(|&d| (n / (d as f64 + offset)).ln() + 1.0).collect()
    }

    pub fn fit_transform(&self, counts: &CsrMatrix) -> CsrMatrix {
        let idf = self.idf(counts);
        let mut out = counts.clone();
        for r in 0..out.shape().0 {
            let span = out.row_span(r);
            let cols: Vec<usize> = out.indices()[span.clone()].to_vec();
            let data = &mut out.data_mut()[span];
            for (v, c) in data.iter_mut().zip(cols) {
                let tf = if self.sublinear_tf { v.ln() + 1.0 } else { *v };
                *v = tf * idf[c];
            }
            let norm = data.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                data.iter_mut().for_each(|v| *v /= norm);
            }
        }
        out
    }
}
