//! Extracts a structured choice from free-form model replies.
//!
//! Models are asked to answer with `"<number>. <reason>"`, but replies drift:
//! some echo the option text, some write `"option 2"`, some ramble. The
//! parser tries progressively looser strategies and finally falls back to the
//! first option at low confidence, so it is total: any reply yields a choice
//! as long as there are options to choose from.

use std::collections::HashSet;

use super::types::ChoiceOutcome;

/// Rationale used when no strategy could read the reply.
const UNPARSED_RATIONALE: &str = "could not parse response";

/// Rationale used when the reply contained a choice but no reason.
const NO_RATIONALE: &str = "no rationale provided";

/// Confidence for the word-overlap strategy.
const OVERLAP_CONFIDENCE: f32 = 0.4;

/// Confidence for the first-option fallback.
const FALLBACK_CONFIDENCE: f32 = 0.3;

/// Parse a model reply into a choice among `options`.
///
/// Strategies, first hit wins:
/// 1. leading 1-based index (`"2. …"`, `"2)"`, `"2:"`, `"2 -"`)
/// 2. option text quoted verbatim in the reply (longest option wins)
/// 3. `"option N"` / `"choice N"` phrasing
/// 4. word overlap between the reply and an option
/// 5. first option at low confidence
///
/// `default_confidence` is the provider's confidence for cleanly parsed
/// replies (strategies 1–3). With empty `options` the trimmed reply itself is
/// returned as the choice; callers only do this for free-text dialogs.
pub fn parse_choice(response: &str, options: &[String], default_confidence: f32) -> ChoiceOutcome {
    let trimmed = response.trim();
    let confidence = default_confidence.clamp(0.0, 1.0);

    if options.is_empty() {
        return ChoiceOutcome {
            choice: trimmed.to_string(),
            rationale: NO_RATIONALE.to_string(),
            confidence,
        };
    }

    match_leading_index(trimmed, options, confidence)
        .or_else(|| match_option_text(trimmed, options, confidence))
        .or_else(|| match_index_phrase(trimmed, options, confidence))
        .or_else(|| match_word_overlap(trimmed, options))
        .unwrap_or_else(|| ChoiceOutcome {
            choice: options[0].clone(),
            rationale: UNPARSED_RATIONALE.to_string(),
            confidence: FALLBACK_CONFIDENCE,
        })
}

/// Strategy 1: a reply starting with a 1-based option number.
fn match_leading_index(
    response: &str,
    options: &[String],
    confidence: f32,
) -> Option<ChoiceOutcome> {
    let first_line = response.lines().next().unwrap_or("");
    let digits: String = first_line
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }

    let index: usize = digits.parse().ok()?;
    if index == 0 || index > options.len() {
        return None;
    }

    let mut rationale = clean_rationale(&first_line[digits.len()..]).to_string();
    let tail = response
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !tail.is_empty() {
        if !rationale.is_empty() {
            rationale.push(' ');
        }
        rationale.push_str(&tail);
    }
    if rationale.is_empty() {
        rationale = NO_RATIONALE.to_string();
    }

    Some(ChoiceOutcome {
        choice: options[index - 1].clone(),
        rationale,
        confidence,
    })
}

/// Strategy 2: an option's full text quoted somewhere in the reply.
///
/// When several options appear ("Save" is a substring of "Don't Save"), the
/// longest match wins so the more specific option is chosen.
fn match_option_text(response: &str, options: &[String], confidence: f32) -> Option<ChoiceOutcome> {
    let lower = response.to_lowercase();
    let mut best: Option<(usize, usize)> = None; // (needle_len, option_index)

    for (i, option) in options.iter().enumerate() {
        let needle = option.to_lowercase();
        if needle.is_empty() || !lower.contains(&needle) {
            continue;
        }
        if best.map_or(true, |(len, _)| needle.len() > len) {
            best = Some((needle.len(), i));
        }
    }

    let (_, index) = best?;
    let needle = options[index].to_lowercase();
    // Split the lowercased reply around the match; the surrounding text is
    // the model's own reasoning.
    let rationale = match lower.split_once(&needle) {
        Some((before, after)) => {
            let after = clean_rationale(after);
            let before = clean_rationale(before);
            if !after.is_empty() {
                after.to_string()
            } else if !before.is_empty() {
                before.to_string()
            } else {
                NO_RATIONALE.to_string()
            }
        }
        None => NO_RATIONALE.to_string(),
    };

    Some(ChoiceOutcome {
        choice: options[index].clone(),
        rationale,
        confidence,
    })
}

/// Strategy 3: `"option N"` or `"choice N"` phrasing.
fn match_index_phrase(response: &str, options: &[String], confidence: f32) -> Option<ChoiceOutcome> {
    let lower = response.to_lowercase();

    for marker in ["option", "choice"] {
        let mut searched = 0;
        while let Some(found) = lower[searched..].find(marker) {
            let after_marker = searched + found + marker.len();
            let tail = lower[after_marker..].trim_start();
            let digits: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
            if let Ok(index) = digits.parse::<usize>() {
                if index >= 1 && index <= options.len() {
                    return Some(ChoiceOutcome {
                        choice: options[index - 1].clone(),
                        rationale: response.to_string(),
                        confidence,
                    });
                }
            }
            searched = after_marker;
        }
    }

    None
}

/// Strategy 4: pick the option sharing the most words with the reply.
/// Ties break toward the earliest option; zero overlap is no match.
fn match_word_overlap(response: &str, options: &[String]) -> Option<ChoiceOutcome> {
    let reply_words = tokenize(response);
    if reply_words.is_empty() {
        return None;
    }

    let mut best: Option<(usize, usize)> = None; // (shared_count, option_index)
    for (i, option) in options.iter().enumerate() {
        let shared = tokenize(option)
            .iter()
            .filter(|w| reply_words.contains(*w))
            .count();
        if shared > 0 && best.map_or(true, |(count, _)| shared > count) {
            best = Some((shared, i));
        }
    }

    let (_, index) = best?;
    Some(ChoiceOutcome {
        choice: options[index].clone(),
        rationale: response.to_string(),
        confidence: OVERLAP_CONFIDENCE,
    })
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trim whitespace and leading separator punctuation from a rationale slice.
fn clean_rationale(raw: &str) -> &str {
    raw.trim_start_matches([' ', '\t', '.', ')', ':', '-', ','])
        .trim()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
