//! Keyword intent classification
//!
//! Rules are checked in priority order and the first rule with a keyword
//! contained in the lowercased utterance wins. Matching is by substring, so
//! "ate" also fires inside longer words.

use crate::messages::Intent;
use regex::Regex;
use std::sync::LazyLock;

/// One classification rule
#[derive(Debug, Clone, Copy)]
pub struct IntentRule {
    pub intent: Intent,
    pub priority: u8,
    pub keywords: &'static [&'static str],
}

/// Rules in ascending priority order (lower wins)
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::Recipe,
        priority: 0,
        keywords: &["recipe", "cook", "make"],
    },
    IntentRule {
        intent: Intent::Consumption,
        priority: 1,
        keywords: &["ate", "eat", "drank", "consumed"],
    },
    IntentRule {
        intent: Intent::Pantry,
        priority: 2,
        keywords: &["pantry", "inventory", "check"],
    },
    IntentRule {
        intent: Intent::Shopping,
        priority: 3,
        keywords: &["shopping", "grocery", "buy"],
    },
];

/// Phrases that switch a pantry query to a low-stock report
const LOW_STOCK_PHRASES: &[&str] = &["low stock", "running out"];

pub const DEFAULT_DISH: &str = "a dish";

// Trigger phrase, then the single word that follows it
static DISH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:recipe for|how to make|make|cook)\s+(\S+)").expect("dish pattern is valid")
});

/// Map an utterance to its intent
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    let mut rules: Vec<&IntentRule> = INTENT_RULES.iter().collect();
    rules.sort_by_key(|rule| rule.priority);

    rules
        .into_iter()
        .find(|rule| rule.keywords.iter().any(|k| lower.contains(k)))
        .map(|rule| rule.intent)
        .unwrap_or(Intent::General)
}

/// Word after "recipe for", "how to make", "make" or "cook"
pub fn extract_dish(text: &str) -> String {
    DISH.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .trim_end_matches(|c: char| c.is_ascii_punctuation())
                .to_string()
        })
        .filter(|dish| !dish.is_empty())
        .unwrap_or_else(|| DEFAULT_DISH.to_string())
}

/// True for "what am I running out of" style pantry questions
pub fn asks_for_low_stock(text: &str) -> bool {
    let lower = text.to_lowercase();
    LOW_STOCK_PHRASES.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_each_intent() {
        assert_eq!(classify("I want to cook pasta"), Intent::Recipe);
        assert_eq!(classify("I ate an apple"), Intent::Consumption);
        assert_eq!(classify("what's in my pantry"), Intent::Pantry);
        assert_eq!(classify("add milk to my grocery list"), Intent::Shopping);
        assert_eq!(classify("hello"), Intent::General);
    }

    #[test]
    fn test_classify_case_insensitive() {
        assert_eq!(classify("RECIPE please"), Intent::Recipe);
        assert_eq!(classify("I Drank coffee"), Intent::Consumption);
    }

    #[test]
    fn test_precedence_recipe_beats_shopping() {
        assert_eq!(classify("cook something and buy bread"), Intent::Recipe);
        assert_eq!(classify("check what I ate"), Intent::Consumption);
    }

    #[test]
    fn test_substring_matching() {
        // "update" contains "ate"
        assert_eq!(classify("update me"), Intent::Consumption);
    }

    #[test]
    fn test_rules_priorities_are_unique() {
        let mut priorities: Vec<u8> = INTENT_RULES.iter().map(|r| r.priority).collect();
        priorities.sort();
        priorities.dedup();
        assert_eq!(priorities.len(), INTENT_RULES.len());
    }

    #[test]
    fn test_extract_dish() {
        assert_eq!(extract_dish("how to make pancakes?"), "pancakes");
        assert_eq!(extract_dish("I want to cook pasta"), "pasta");
        assert_eq!(extract_dish("recipe ideas"), "a dish");
        assert_eq!(extract_dish("what can I make."), "a dish");
    }

    #[test]
    fn test_extract_dish_takes_one_word() {
        assert_eq!(extract_dish("I want to cook pasta tonight"), "pasta");
        assert_eq!(extract_dish("recipe for chicken curry"), "chicken");
        assert_eq!(extract_dish("Give me a recipe for lasagna, please"), "lasagna");
    }

    #[test]
    fn test_low_stock_phrases() {
        assert!(asks_for_low_stock("What is LOW STOCK in my pantry"));
        assert!(asks_for_low_stock("am I running out of anything"));
        assert!(!asks_for_low_stock("check my pantry"));
    }
}
