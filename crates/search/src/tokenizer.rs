use std::collections::BTreeSet;

const MIN_TERM_CHARS: usize = 3;

const STOPWORDS: &[&str] = &[
    // Articles and conjunctions.
    "the", "and", "but", "nor", "yet",
    // Prepositions.
    "for", "from", "into", "onto", "with", "within", "without", "about", "over", "under",
    "between", "through", "via",
    // Auxiliary verbs.
    "are", "was", "were", "been", "being", "has", "have", "had", "does", "did", "doing",
    "will", "would", "can", "could", "should", "shall", "may", "might", "must",
    // Pronouns and determiners.
    "you", "your", "yours", "our", "ours", "its", "his", "her", "hers", "him", "she",
    "they", "them", "their", "theirs", "this", "that", "these", "those", "all", "any",
    "some", "each", "every", "there", "here",
    // Question words.
    "what", "where", "when", "which", "who", "whom", "whose", "why", "how",
    // Interrogation terms.
    "find", "show", "get", "give", "list", "locate", "look", "tell", "display", "please",
];

/// Significant lowercase terms of a query. Order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTerms(BTreeSet<String>);

impl QueryTerms {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.0.contains(term)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// True when any term occurs as a substring of `haystack_lower` (already lowercased).
    pub fn any_within(&self, haystack_lower: &str) -> bool {
        self.0.iter().any(|term| haystack_lower.contains(term.as_str()))
    }
}

impl FromIterator<String> for QueryTerms {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub struct QueryTokenizer;

impl QueryTokenizer {
    /// Lowercases, splits on anything that is not alphanumeric, `_` or `-`, and keeps
    /// tokens longer than two characters that are not stopwords.
    pub fn tokenize(query: &str) -> QueryTerms {
        query
            .to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
            .filter(|token| token.chars().count() >= MIN_TERM_CHARS)
            .filter(|token| !is_stopword(token))
            .map(str::to_string)
            .collect()
    }
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn drops_stopwords_and_short_words() {
        let terms = QueryTokenizer::tokenize("find all functions that handle user authentication");
        let collected: Vec<&str> = terms.iter().collect();
        assert_eq!(collected, vec!["authentication", "functions", "handle", "user"]);
    }

    #[test]
    fn keeps_identifier_characters() {
        let terms = QueryTokenizer::tokenize("Where is parse_config and retry-policy?");
        assert!(terms.contains("parse_config"));
        assert!(terms.contains("retry-policy"));
        assert!(!terms.contains("where"));
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn punctuation_splits_tokens() {
        let terms = QueryTokenizer::tokenize("auth.login(user)");
        assert!(terms.contains("auth"));
        assert!(terms.contains("login"));
        assert!(terms.contains("user"));
    }

    #[test]
    fn empty_terms_never_match() {
        let terms = QueryTokenizer::tokenize("how do I get it?");
        assert!(terms.is_empty());
        assert!(!terms.any_within("how do i get it"));
    }

    #[test]
    fn duplicate_words_collapse() {
        let terms = QueryTokenizer::tokenize("cache cache CACHE");
        assert_eq!(terms.len(), 1);
    }

    proptest! {
        #[test]
        fn proptest_stopword_only_queries_yield_no_terms(
            words in proptest::collection::vec(
                prop_oneof![
                    proptest::sample::select(STOPWORDS.to_vec()).prop_map(str::to_string),
                    "[a-zA-Z]{1,2}",
                ],
                0..12,
            ),
            separator in "[ ,.?!]{1,2}",
        ) {
            let query = words.join(&separator);
            prop_assert!(QueryTokenizer::tokenize(&query).is_empty());
        }

        #[test]
        fn proptest_tokenize_is_order_insensitive(
            words in proptest::collection::vec("[a-z]{1,10}", 0..8),
        ) {
            let forward = words.join(" ");
            let mut reversed_words = words.clone();
            reversed_words.reverse();
            let backward = reversed_words.join(" ");
            prop_assert_eq!(
                QueryTokenizer::tokenize(&forward),
                QueryTokenizer::tokenize(&backward)
            );
        }
    }
}
