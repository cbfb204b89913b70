use moka::sync::Cache;

/// Cache key normalization: case-insensitive, whitespace-insensitive. The
/// intent classifier is deterministic over the same normalized text, so two
/// questions with the same key always produce the same analysis.
pub fn normalize_question(question: &str) -> String {
    question
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Answer cache keyed by dataset name plus normalized question text; the same
/// question against different datasets yields different answers, so the key
/// must carry both. Capacity-bounded LFU/LRU via moka, no time-based expiry:
/// entries live for the process lifetime.
#[derive(Clone)]
pub struct AnswerCache {
    inner: Cache<String, String>,
}

fn cache_key(dataset: &str, question: &str) -> String {
    format!("{}::{}", dataset, normalize_question(question))
}

impl AnswerCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    pub fn get(&self, dataset: &str, question: &str) -> Option<String> {
        self.inner.get(&cache_key(dataset, question))
    }

    pub fn insert(&self, dataset: &str, question: &str, answer: String) {
        self.inner.insert(cache_key(dataset, question), answer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_case_and_whitespace() {
        assert_eq!(
            normalize_question("  What   is\tthe AVERAGE score? "),
            "what is the average score?"
        );
        assert_eq!(
            normalize_question(&normalize_question("A  B")),
            normalize_question("A  B")
        );
    }

    #[test]
    fn hit_is_insensitive_to_spacing() {
        let cache = AnswerCache::new(16);
        cache.insert("h1_2025", "What is the average score?", "42".to_string());
        assert_eq!(
            cache.get("h1_2025", "  what IS the   average score?").as_deref(),
            Some("42")
        );
        assert!(cache.get("h1_2025", "what is the maximum score?").is_none());
    }

    #[test]
    fn datasets_do_not_share_entries() {
        let cache = AnswerCache::new(16);
        cache.insert("h1_2025", "what is the average score?", "42".to_string());

        assert!(cache.get("h2_2024", "what is the average score?").is_none());

        cache.insert("h2_2024", "what is the average score?", "17".to_string());
        assert_eq!(
            cache.get("h1_2025", "what is the average score?").as_deref(),
            Some("42")
        );
        assert_eq!(
            cache.get("h2_2024", "what is the average score?").as_deref(),
            Some("17")
        );
    }
}
