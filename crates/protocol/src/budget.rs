/// Rough token estimate used for every budget in the engine: one token per four chars.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Drop items from the tail until the summed cost fits `max_tokens`.
///
/// Returns the final total.
pub fn enforce_token_budget<T>(
    items: &mut Vec<T>,
    max_tokens: usize,
    mut cost: impl FnMut(&T) -> usize,
) -> usize {
    let mut total: usize = items.iter().map(&mut cost).sum();
    while total > max_tokens {
        let Some(last) = items.pop() else {
            break;
        };
        total = total.saturating_sub(cost(&last));
    }
    total
}

/// Cut `text` to whole lines so that it stays within `max_tokens`.
#[must_use]
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }
    let mut out = String::new();
    for line in text.lines() {
        let candidate = if out.is_empty() {
            line.to_string()
        } else {
            format!("{out}\n{line}")
        };
        if estimate_tokens(&candidate) > max_tokens {
            break;
        }
        out = candidate;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn enforce_drops_tail_items() {
        let mut items = vec!["aaaa".repeat(10), "bbbb".repeat(10), "cccc".repeat(10)];
        let total = enforce_token_budget(&mut items, 25, |s| estimate_tokens(s));
        assert_eq!(items.len(), 2);
        assert_eq!(total, 20);
    }

    #[test]
    fn enforce_can_empty_the_list() {
        let mut items = vec!["x".repeat(40)];
        let total = enforce_token_budget(&mut items, 0, |s| estimate_tokens(s));
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn truncate_keeps_whole_lines() {
        let text = "line one\nline two\nline three";
        let cut = truncate_to_tokens(text, 5);
        assert_eq!(cut, "line one\nline two");
        assert!(estimate_tokens(&cut) <= 5);
    }
}
