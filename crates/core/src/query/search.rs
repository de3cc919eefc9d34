//! Relevance scoring for free-text search.

use crate::cache::strategy::normalize_label;
use crate::metrics::similarity;
use crate::record::{Record, get_path};
use serde::{Deserialize, Serialize};

/// Per-website-type search tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Searched fields with their weights.
    pub fields: Vec<(String, f64)>,
    /// Normalized similarity a field must exceed to earn fuzzy credit.
    pub fuzzy_threshold: f64,
    /// Multipliers applied when the named field is present and non-empty.
    pub boosts: Vec<(String, f64)>,
}

fn pairs(items: &[(&str, f64)]) -> Vec<(String, f64)> {
    items.iter().map(|(name, w)| ((*name).to_string(), *w)).collect()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fields: pairs(&[("title", 2.0), ("name", 2.0), ("description", 1.0), ("content", 1.0)]),
            fuzzy_threshold: 0.8,
            boosts: Vec::new(),
        }
    }
}

impl SearchConfig {
    /// Look up the search config for a website type, falling back to the default.
    pub fn for_website_type(label: &str) -> SearchConfig {
        match normalize_label(label).as_str() {
            "ecommerce" => SearchConfig {
                fields: pairs(&[
                    ("title", 3.0),
                    ("name", 3.0),
                    ("brand", 2.0),
                    ("category", 1.5),
                    ("description", 1.0),
                ]),
                fuzzy_threshold: 0.7,
                boosts: pairs(&[("rating", 1.2), ("in_stock", 1.1)]),
            },
            "news" => SearchConfig {
                fields: pairs(&[
                    ("title", 3.0),
                    ("headline", 3.0),
                    ("summary", 2.0),
                    ("author", 1.0),
                    ("content", 1.0),
                ]),
                fuzzy_threshold: 0.75,
                boosts: pairs(&[("published_at", 1.1)]),
            },
            "social" => SearchConfig {
                fields: pairs(&[("text", 2.0), ("author", 1.5), ("hashtags", 1.5)]),
                fuzzy_threshold: 0.8,
                boosts: pairs(&[("verified", 1.2)]),
            },
            "jobs" => SearchConfig {
                fields: pairs(&[("title", 3.0), ("company", 2.0), ("location", 1.5), ("description", 1.0)]),
                fuzzy_threshold: 0.75,
                boosts: pairs(&[("salary", 1.1)]),
            },
            "real_estate" => SearchConfig {
                fields: pairs(&[("title", 2.0), ("address", 2.5), ("city", 2.0), ("description", 1.0)]),
                fuzzy_threshold: 0.75,
                boosts: pairs(&[("images", 1.1)]),
            },
            "blog" => SearchConfig {
                fields: pairs(&[("title", 3.0), ("tags", 2.0), ("excerpt", 1.5), ("content", 1.0)]),
                fuzzy_threshold: 0.8,
                boosts: Vec::new(),
            },
            _ => SearchConfig::default(),
        }
    }

    /// Relevance of `record` for the already-lowercased `query`.
    pub fn score(&self, record: &Record, query: &str) -> f64 {
        let query_words: Vec<&str> = query.split_whitespace().collect();
        let mut score = 0.0;

        for (field, weight) in &self.fields {
            let Some(value) = get_path(record, field) else { continue };
            if value.is_empty() {
                continue;
            }
            let text = value.as_text().to_lowercase();

            if text.contains(query) {
                score += weight * 10.0;
            }

            let sim = similarity(&text, query);
            if sim > self.fuzzy_threshold {
                score += weight * sim * 5.0;
            }

            if !query_words.is_empty() {
                let field_words: Vec<&str> = text.split_whitespace().collect();
                let matched = query_words
                    .iter()
                    .filter(|qw| field_words.iter().any(|fw| fw.contains(**qw)))
                    .count();
                score += weight * (matched as f64 / query_words.len() as f64) * 3.0;
            }
        }

        for (field, factor) in &self.boosts {
            if get_path(record, field).is_some_and(|v| !v.is_empty()) {
                score *= factor;
            }
        }

        score
    }
}

/// Drop records scoring zero and order the rest by descending relevance.
///
/// Equal scores keep their input order.
pub fn search(records: Vec<Record>, term: &str, config: &SearchConfig) -> Vec<Record> {
    let query = term.trim().to_lowercase();
    if query.is_empty() {
        return records;
    }

    let mut scored: Vec<(f64, Record)> = records
        .into_iter()
        .map(|record| (config.score(&record, &query), record))
        .filter(|(score, _)| *score > 0.0)
        .collect();

    scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, record)| record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    fn shoes() -> Vec<Record> {
        vec![
            record(&[("title", "Red Shoes".into()), ("price", "$40".into())]),
            record(&[("title", "Blue Shoes".into()), ("price", "$85".into())]),
        ]
    }

    #[test]
    fn test_search_scenario_default_weights() {
        let config = SearchConfig::default();
        for r in shoes() {
            assert!(config.score(&r, "shoe") > 0.0);
        }
        let result = search(shoes(), "shoe", &config);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["title"], Value::from("Red Shoes"));
    }

    #[test]
    fn test_search_orders_by_relevance() {
        let records = vec![
            record(&[("title", "Running gear".into()), ("description", "fast shoes".into())]),
            record(&[("title", "Shoes".into())]),
        ];
        let result = search(records, "shoes", &SearchConfig::default());
        assert_eq!(result[0]["title"], Value::from("Shoes"));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_search_drops_zero_scores() {
        let result = search(shoes(), "hat", &SearchConfig::default());
        assert!(result.is_empty());
    }

    #[test]
    fn test_fuzzy_credit() {
        let rec = record(&[("title", "shoez".into())]);
        // no substring or word match; similarity is 0.8
        let strict = SearchConfig { fuzzy_threshold: 0.9, ..SearchConfig::default() };
        let loose = SearchConfig { fuzzy_threshold: 0.75, ..SearchConfig::default() };
        assert_eq!(strict.score(&rec, "shoes"), 0.0);
        assert!(loose.score(&rec, "shoes") > 0.0);
    }

    #[test]
    fn test_word_overlap_partial() {
        let config = SearchConfig { fields: pairs(&[("title", 1.0)]), fuzzy_threshold: 0.99, boosts: Vec::new() };
        let rec = record(&[("title", "red shoes".into())]);
        // "red boots" is not a substring; one of two words matches
        let score = config.score(&rec, "red boots");
        assert!((score - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_boosts_multiply() {
        let config = SearchConfig::for_website_type("ecommerce");
        let plain = record(&[("title", "Shoes".into())]);
        let boosted = record(&[("title", "Shoes".into()), ("rating", Value::Number(4.5)), ("in_stock", true.into())]);
        let base = config.score(&plain, "shoes");
        let with_boost = config.score(&boosted, "shoes");
        assert!((with_boost - base * 1.2 * 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_boost_field_is_ignored() {
        let config = SearchConfig::for_website_type("ecommerce");
        let rec = record(&[("title", "Shoes".into()), ("rating", "".into())]);
        let plain = record(&[("title", "Shoes".into())]);
        assert_eq!(config.score(&rec, "shoes"), config.score(&plain, "shoes"));
    }

    #[test]
    fn test_unknown_type_uses_default() {
        assert_eq!(SearchConfig::for_website_type("forum"), SearchConfig::default());
    }
}
