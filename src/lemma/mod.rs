//! Language-aware lemmatization
//!
//! This module turns free text into normalized word forms ("lemmas"):
//! - Tokenization keeps Latin/Cyrillic letters, digits, hyphens, and
//!   apostrophes; everything else is a separator
//! - Each token is routed to a per-script Snowball stemmer (Cyrillic to
//!   Russian, Latin to English); tokens in any other script are skipped
//! - Closed-class words (conjunctions, prepositions, particles, pronouns)
//!   are discarded entirely
//!
//! The analyzer state (stemmers and stop-word sets) is built once with
//! [`Lemmatizer::new`] and shared immutably; callers typically hold it in
//! an `Arc`. A token the analyzer cannot handle is skipped, never an
//! error, so these operations cannot fail mid-text.

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};

/// English closed-class words: conjunctions, prepositions, pronouns.
const ENGLISH_STOP_CLASSES: &[&str] = &[
    // conjunctions
    "and", "or", "but", "nor", "so", "yet", "for", "if", "while", "although", "though", "because",
    "since", "unless", "until", "whereas", "than", "whether",
    // prepositions
    "in", "on", "at", "by", "with", "from", "into", "onto", "over", "under", "about", "above",
    "after", "before", "between", "through", "during", "of", "to", "off", "up", "down", "out",
    "near", "against", "along", "among", "around", "behind", "below", "beneath", "beside",
    "beyond", "inside", "outside", "toward", "towards", "upon", "within", "without",
    // pronouns
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my", "your",
    "his", "its", "our", "their", "mine", "yours", "hers", "ours", "theirs", "this", "that",
    "these", "those", "who", "whom", "whose", "which", "what", "anyone", "anything", "everyone",
    "everything", "someone", "something", "nobody", "nothing", "myself", "yourself", "himself",
    "herself", "itself", "ourselves", "themselves",
];

/// Russian closed-class words: prepositions, conjunctions, particles,
/// pronouns, interjections. Single-letter words (в, с, к, у, о, а, и)
/// never reach the filter because tokens of length 1 are dropped first.
const RUSSIAN_STOP_CLASSES: &[&str] = &[
    // prepositions
    "на", "по", "за", "от", "до", "из", "об", "обо", "при", "над", "под", "про", "для", "без",
    "через", "между", "перед", "передо", "около", "вокруг", "среди", "возле", "кроме", "ради",
    "сквозь", "вдоль", "из-за", "из-под",
    // conjunctions
    "но", "или", "либо", "да", "что", "чтобы", "как", "когда", "если", "хотя", "пока", "будто",
    "словно", "тоже", "также", "зато", "однако", "причем", "притом", "ибо", "дабы",
    // particles
    "не", "ни", "же", "ли", "бы", "вот", "вон", "уж", "ведь", "лишь", "только", "даже", "именно",
    "почти", "разве", "неужели", "пусть", "пускай", "мол", "дескать",
    // pronouns
    "он", "она", "оно", "они", "мы", "вы", "ты", "его", "ее", "её", "их", "нас", "вас", "меня",
    "тебя", "себя", "ему", "ей", "им", "нам", "вам", "мне", "тебе", "себе", "это", "этот", "эта",
    "эти", "тот", "та", "те", "кто", "чей", "чья", "чье", "чьи", "весь", "вся", "все", "всё",
    "сам", "сама", "само", "сами", "мой", "моя", "мое", "мои", "твой", "наш", "ваш", "свой",
    // interjections
    "ах", "ох", "эх", "ой", "ну", "увы", "ага", "эй",
];

/// A single token occurrence: the surface (inflected) form as it appears
/// in the text, paired with its lemma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LemmaOccurrence {
    pub surface: String,
    pub lemma: String,
}

/// Script-aware morphological normalizer
///
/// Holds the English and Russian Snowball stemmers plus the per-language
/// closed-class word sets. Construction is cheap and infallible; the
/// resulting value is immutable and safe to share across threads.
pub struct Lemmatizer {
    english: Stemmer,
    russian: Stemmer,
    english_stop: HashSet<&'static str>,
    russian_stop: HashSet<&'static str>,
}

impl Lemmatizer {
    /// Builds the analyzer with both language dictionaries loaded
    pub fn new() -> Self {
        Self {
            english: Stemmer::create(Algorithm::English),
            russian: Stemmer::create(Algorithm::Russian),
            english_stop: ENGLISH_STOP_CLASSES.iter().copied().collect(),
            russian_stop: RUSSIAN_STOP_CLASSES.iter().copied().collect(),
        }
    }

    /// Collects lemma occurrence counts from a text
    ///
    /// Returns a map from lemma to the number of times any of its
    /// inflected forms occurs in the text. This is the indexing input:
    /// the count becomes the rank of the (page, lemma) index entry.
    pub fn collect_lemma_counts(&self, text: &str) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for token in split_words(text) {
            if let Some(lemma) = self.normalize(&token) {
                *counts.entry(lemma).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Returns the set of distinct lemmas occurring in a text
    ///
    /// Used for query parsing and for frequency decrements when a page is
    /// removed from the index.
    pub fn lemma_set(&self, text: &str) -> HashSet<String> {
        let mut set = HashSet::new();
        for token in split_words(text) {
            if let Some(lemma) = self.normalize(&token) {
                set.insert(lemma);
            }
        }
        set
    }

    /// Returns every analyzable token in order, keeping its surface form
    ///
    /// Snippet highlighting needs the original inflected spelling to wrap
    /// in markup, so this operation preserves it alongside the lemma.
    pub fn lemma_occurrences(&self, text: &str) -> Vec<LemmaOccurrence> {
        let mut occurrences = Vec::new();
        for token in split_words(text) {
            if let Some(lemma) = self.normalize(&token) {
                occurrences.push(LemmaOccurrence {
                    surface: token,
                    lemma,
                });
            }
        }
        occurrences
    }

    /// Normalizes a single token to its lemma, or None if the token is
    /// skipped (unsupported script or closed grammatical class)
    fn normalize(&self, token: &str) -> Option<String> {
        if token.chars().any(is_cyrillic) {
            if self.russian_stop.contains(token) {
                return None;
            }
            Some(self.russian.stem(token).to_string())
        } else if token.chars().any(|c| c.is_ascii_alphabetic()) {
            if self.english_stop.contains(token) {
                return None;
            }
            Some(self.english.stem(token).to_string())
        } else {
            // digits/hyphens only, or some other script
            None
        }
    }
}

impl Default for Lemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, 'а'..='я' | 'ё')
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, 'а'..='я' | 'ё' | '-' | '\'')
}

/// Lowercases the text and splits it into candidate tokens
///
/// Anything that is not a Latin/Cyrillic letter, digit, hyphen, or
/// apostrophe separates tokens; tokens of length 1 or less are dropped.
fn split_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !is_word_char(c))
        .filter(|w| w.chars().count() > 1)
        .map(|w| w.to_string())
        .collect()
}
