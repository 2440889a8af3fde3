use ratatui::style::Style;
use ratatui::text::Span;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

/// Case-insensitive alternation of the given terms, longest first so that
/// overlapping terms prefer the longer match.
pub fn build_highlight_regex(terms: &[String]) -> Option<Regex> {
    let mut seen = HashSet::new();
    let mut unique: Vec<&str> = terms
        .iter()
        .map(|term| term.trim())
        .filter(|term| !term.is_empty() && seen.insert(term.to_lowercase()))
        .collect();
    if unique.is_empty() {
        return None;
    }
    unique.sort_by_key(|term| std::cmp::Reverse(term.len()));
    let pattern = unique
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

pub fn highlight_spans(
    text: &str,
    regex: Option<&Regex>,
    base: Style,
    highlight: Style,
) -> Vec<Span<'static>> {
    let Some(regex) = regex else {
        return vec![Span::styled(text.to_string(), base)];
    };
    let mut spans = Vec::new();
    let mut last = 0;
    for found in regex.find_iter(text) {
        if found.start() > last {
            spans.push(Span::styled(text[last..found.start()].to_string(), base));
        }
        spans.push(Span::styled(found.as_str().to_string(), base.patch(highlight)));
        last = found.end();
    }
    if last < text.len() || spans.is_empty() {
        spans.push(Span::styled(text[last..].to_string(), base));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Modifier;

    #[test]
    fn longer_terms_win() {
        let regex = build_highlight_regex(&["snow".into(), "snow miku".into()]).expect("regex");
        let found: Vec<_> = regex
            .find_iter("[m001] Snow Miku (Miku)")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["Snow Miku"]);
    }

    #[test]
    fn terms_are_escaped_and_deduplicated() {
        let regex = build_highlight_regex(&["[m001]".into(), "[M001]".into(), " ".into()])
            .expect("regex");
        assert_eq!(regex.find_iter("[m001] Snow").count(), 1);
        assert!(build_highlight_regex(&["  ".into()]).is_none());
    }

    #[test]
    fn spans_cover_the_whole_text() {
        let regex = build_highlight_regex(&["miku".into()]);
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let spans = highlight_spans("Snow Miku (Miku)", regex.as_ref(), Style::default(), bold);
        let joined: String = spans.iter().map(|span| span.content.as_ref()).collect();
        assert_eq!(joined, "Snow Miku (Miku)");
        let highlighted: Vec<_> = spans
            .iter()
            .filter(|span| span.style.add_modifier.contains(Modifier::BOLD))
            .map(|span| span.content.as_ref())
            .collect();
        assert_eq!(highlighted, vec!["Miku", "Miku"]);
    }
}
