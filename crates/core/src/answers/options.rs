//! Mapping free-text answers onto the options a field offers.

use strsim::normalized_levenshtein;

/// Minimum similarity for a fuzzy option match.
const SIMILARITY_THRESHOLD: f64 = 0.75;

const YES_WORDS: &[&str] = &["yes", "y", "true", "agree", "i agree", "accept", "i accept"];
const NO_WORDS: &[&str] = &["no", "n", "false", "disagree", "i do not agree", "decline"];

/// Whether an option is a "Select an option" style placeholder.
pub fn is_placeholder(option: &str) -> bool {
    let option = option.trim().to_lowercase();
    option.is_empty() || option.starts_with("select") || option == "--" || option == "choose"
}

fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() || c == '+' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn polarity(text: &str) -> Option<bool> {
    let first = text.split_whitespace().next().unwrap_or_default();
    if YES_WORDS.contains(&text) || first == "yes" {
        Some(true)
    } else if NO_WORDS.contains(&text) || first == "no" {
        Some(false)
    } else {
        None
    }
}

/// Pick the option that best matches `preferred`.
///
/// Matching order: exact (normalized), yes/no synonyms, containment, then
/// string similarity above a fixed threshold. Placeholders never match.
pub fn choose_option(preferred: &str, options: &[String]) -> Option<usize> {
    let wanted = normalize(preferred);
    if wanted.is_empty() {
        return None;
    }

    let candidates: Vec<(usize, String)> = options
        .iter()
        .enumerate()
        .filter(|(_, option)| !is_placeholder(option))
        .map(|(i, option)| (i, normalize(option)))
        .collect();

    if let Some((i, _)) = candidates.iter().find(|(_, option)| *option == wanted) {
        return Some(*i);
    }

    if let Some(wanted_polarity) = polarity(&wanted) {
        if let Some((i, _)) = candidates
            .iter()
            .find(|(_, option)| polarity(option) == Some(wanted_polarity))
        {
            return Some(*i);
        }
    }

    if let Some((i, _)) = candidates
        .iter()
        .find(|(_, option)| option.contains(&wanted) || wanted.contains(option.as_str()))
    {
        return Some(*i);
    }

    candidates
        .iter()
        .map(|(i, option)| (*i, normalized_levenshtein(option, &wanted)))
        .filter(|(_, score)| *score >= SIMILARITY_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Map each comma-separated preference onto an option, keeping option order
/// and dropping duplicates and misses.
pub fn choose_options(preferred: &str, options: &[String]) -> Vec<String> {
    let mut picked: Vec<usize> = preferred
        .split([',', ';', '\n'])
        .filter_map(|part| choose_option(part, options))
        .collect();
    picked.sort_unstable();
    picked.dedup();
    picked.into_iter().map(|i| options[i].clone()).collect()
}
