//! Wildcard patterns for name filtering.
//!
//! - `*` matches zero or more characters
//! - `?` matches exactly one character
//! - `[abc]` / `[a-z]` matches any character in the set or range
//! - `[!abc]` matches any character NOT in the set
//! - `` ` `` escapes the next character

/// Maximum number of recursive calls per match. Bounds backtracking on
/// patterns like `*a*a*a*...*a`.
const MAX_MATCH_CALLS: usize = 100_000;

/// A compiled wildcard pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    source: String,
    chars: Vec<char>,
    ignore_case: bool,
}

impl WildcardPattern {
    /// Case-sensitive pattern.
    pub fn new(pattern: &str) -> Self {
        Self::build(pattern, false)
    }

    /// Pattern that folds case on both sides.
    pub fn ignore_case(pattern: &str) -> Self {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, ignore_case: bool) -> Self {
        let chars = if ignore_case {
            pattern.chars().flat_map(char::to_lowercase).collect()
        } else {
            pattern.chars().collect()
        };
        Self {
            source: pattern.to_string(),
            chars,
            ignore_case,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the pattern contains any wildcard metacharacter.
    pub fn contains_wildcard(pattern: &str) -> bool {
        pattern.contains(['*', '?', '['])
    }

    /// True if the whole input matches.
    pub fn is_match(&self, input: &str) -> bool {
        let input: Vec<char> = if self.ignore_case {
            input.chars().flat_map(char::to_lowercase).collect()
        } else {
            input.chars().collect()
        };
        let mut calls = 0usize;
        match_bounded(&self.chars, 0, &input, 0, &mut calls)
    }
}

fn match_bounded(pattern: &[char], pi: usize, input: &[char], ii: usize, calls: &mut usize) -> bool {
    *calls += 1;
    if *calls > MAX_MATCH_CALLS {
        return false;
    }

    if pi >= pattern.len() {
        return ii >= input.len();
    }

    match pattern[pi] {
        '*' => {
            let mut next_pi = pi;
            while next_pi < pattern.len() && pattern[next_pi] == '*' {
                next_pi += 1;
            }
            if next_pi >= pattern.len() {
                return true;
            }
            (ii..=input.len()).any(|start| match_bounded(pattern, next_pi, input, start, calls))
        }

        '?' => ii < input.len() && match_bounded(pattern, pi + 1, input, ii + 1, calls),

        '[' => {
            if ii >= input.len() {
                return false;
            }
            match char_class(&pattern[pi..], input[ii]) {
                Some((true, consumed)) => match_bounded(pattern, pi + consumed, input, ii + 1, calls),
                Some((false, _)) => false,
                // Unclosed bracket is a literal.
                None => input[ii] == '[' && match_bounded(pattern, pi + 1, input, ii + 1, calls),
            }
        }

        '`' if pi + 1 < pattern.len() => {
            ii < input.len()
                && pattern[pi + 1] == input[ii]
                && match_bounded(pattern, pi + 2, input, ii + 1, calls)
        }

        c => ii < input.len() && c == input[ii] && match_bounded(pattern, pi + 1, input, ii + 1, calls),
    }
}

/// Evaluate a `[...]` class against `ch`. Returns whether it matched and
/// how many pattern chars the class spans, or `None` if it never closes.
fn char_class(pattern: &[char], ch: char) -> Option<(bool, usize)> {
    let mut idx = 1;
    let negate = pattern.get(idx) == Some(&'!');
    if negate {
        idx += 1;
    }

    // `]` directly after the opening bracket is literal.
    let first = idx;
    let mut matched = false;
    while idx < pattern.len() {
        let c = pattern[idx];
        if c == ']' && idx > first {
            return Some((matched != negate, idx + 1));
        }
        if idx + 2 < pattern.len() && pattern[idx + 1] == '-' && pattern[idx + 2] != ']' {
            if (c..=pattern[idx + 2]).contains(&ch) {
                matched = true;
            }
            idx += 3;
            continue;
        }
        if c == ch {
            matched = true;
        }
        idx += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(pattern: &str, input: &str) -> bool {
        WildcardPattern::new(pattern).is_match(input)
    }

    #[test]
    fn literal_matches() {
        assert!(m("hello", "hello"));
        assert!(m("", ""));
        assert!(!m("hello", "hell"));
        assert!(!m("hello", "helloo"));
    }

    #[test]
    fn star_wildcard() {
        assert!(m("*", ""));
        assert!(m("Ps*", "PsHome"));
        assert!(m("a*b*c", "aXXXbYYYc"));
        assert!(!m("test*", "mytest"));
    }

    #[test]
    fn question_wildcard() {
        assert!(m("?", "a"));
        assert!(!m("?", ""));
        assert!(m("v?r", "var"));
    }

    #[test]
    fn char_classes() {
        assert!(m("[abc]", "b"));
        assert!(m("[a-c]x", "cx"));
        assert!(!m("[!a-c]", "b"));
        assert!(m("[!a-c]", "z"));
        assert!(m("[]]", "]"));
        assert!(m("a[b", "a[b"));
    }

    #[test]
    fn escape_makes_metachar_literal() {
        assert!(m("a`*", "a*"));
        assert!(!m("a`*", "ab"));
    }

    #[test]
    fn ignore_case_folds_both_sides() {
        let p = WildcardPattern::ignore_case("HOST*");
        assert!(p.is_match("hostname"));
        assert!(p.is_match("HostName"));
        assert!(!WildcardPattern::new("HOST*").is_match("hostname"));
    }

    #[test]
    fn pathological_pattern_terminates() {
        let pattern = "*a".repeat(30);
        let input = "a".repeat(29) + "b";
        assert!(!m(&pattern, &input));
    }

    #[test]
    fn detects_wildcards() {
        assert!(WildcardPattern::contains_wildcard("a*"));
        assert!(WildcardPattern::contains_wildcard("[ab]"));
        assert!(!WildcardPattern::contains_wildcard("plain"));
    }
}
