//! Ranked snippet search: exact filters, fuzzy title matching, then substring
//! matching on tags and body.

use nucleo_matcher::pattern::{Atom, AtomKind, CaseMatching, Normalization};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use serde::Serialize;

use crate::models::Snippet;

/// Awarded when any tag contains the query.
pub const TAG_MATCH_SCORE: u32 = 10;
/// Awarded when the body contains the query.
pub const BODY_MATCH_SCORE: u32 = 5;

/// Query plus exact filters. Empty fields mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub query: String,
    /// Every tag must be present (AND).
    pub tags: Vec<String>,
    pub language: String,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn has_filters(&self) -> bool {
        !self.tags.is_empty() || !self.language.is_empty()
    }
}

/// A snippet copy and its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub snippet: Snippet,
    pub score: u32,
}

/// True when the snippet carries every requested tag (case-insensitive).
pub fn matches_tags(snippet: &Snippet, tags: &[String]) -> bool {
    tags.iter().all(|tag| snippet.has_tag(tag))
}

/// True when no language is requested or the snippet's language matches it case-insensitively.
pub fn matches_language(snippet: &Snippet, language: &str) -> bool {
    language.is_empty() || snippet.language.to_lowercase() == language.to_lowercase()
}

fn substring_score(snippet: &Snippet, needle: &str) -> u32 {
    let mut score = 0;
    if snippet
        .tags
        .iter()
        .any(|tag| tag.to_lowercase().contains(needle))
    {
        score += TAG_MATCH_SCORE;
    }
    if snippet.body.to_lowercase().contains(needle) {
        score += BODY_MATCH_SCORE;
    }
    score
}

/// Filters and ranks `snippets`, returning copies sorted by descending score.
///
/// Title matches are taken first and never scored again on tags or body.
/// Equal scores keep their candidate order.
pub fn rank<'a, I>(snippets: I, options: &SearchOptions) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a Snippet>,
{
    let candidates = snippets.into_iter().filter(|snippet| {
        matches_tags(snippet, &options.tags) && matches_language(snippet, &options.language)
    });

    if options.query.trim().is_empty() {
        return candidates
            .map(|snippet| SearchResult {
                snippet: snippet.clone(),
                score: 0,
            })
            .collect();
    }

    // One atom for the whole query: it must appear in the title as a subsequence.
    let atom = Atom::new(
        &options.query,
        CaseMatching::Ignore,
        Normalization::Smart,
        AtomKind::Fuzzy,
        false,
    );
    let mut matcher = Matcher::new(Config::DEFAULT);
    let mut utf32buf = Vec::new();
    let needle = options.query.to_lowercase();

    let mut title_hits = Vec::new();
    let mut other_hits = Vec::new();
    for snippet in candidates {
        let haystack = Utf32Str::new(&snippet.title, &mut utf32buf);
        if let Some(score) = atom.score(haystack, &mut matcher) {
            title_hits.push(SearchResult {
                snippet: snippet.clone(),
                score: u32::from(score).max(1),
            });
            continue;
        }

        let score = substring_score(snippet, &needle);
        if score > 0 {
            other_hits.push(SearchResult {
                snippet: snippet.clone(),
                score,
            });
        }
    }

    title_hits.append(&mut other_hits);
    // sort_by is stable
    title_hits.sort_by(|a, b| b.score.cmp(&a.score));
    title_hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(id: &str, title: &str, tags: &[&str], language: &str, body: &str) -> Snippet {
        Snippet {
            id: id.into(),
            title: title.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            language: language.into(),
            body: body.into(),
            ..Snippet::default()
        }
    }

    fn scenario() -> Vec<Snippet> {
        vec![
            snippet(
                "A",
                "Go Programming",
                &["go", "programming"],
                "",
                "This is about Go programming language",
            ),
            snippet(
                "B",
                "Python Tutorial",
                &["python", "tutorial"],
                "",
                "Learn Python programming",
            ),
            snippet("C", "Web Dev", &["web"], "", "..."),
            snippet("D", "Other", &["web"], "", "web stuff"),
        ]
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.snippet.id.as_str()).collect()
    }

    fn search(snippets: &[Snippet], query: &str) -> Vec<SearchResult> {
        rank(snippets, &SearchOptions::new().query(query))
    }

    fn assert_descending(results: &[SearchResult]) {
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn fuzzy_title_hit() {
        let results = search(&scenario(), "Go");
        assert_eq!(ids(&results), vec!["A"]);
        assert!(results[0].score > 0);
    }

    #[test]
    fn tag_hits_rank_above_weaker_matches() {
        let snippets = scenario();
        let results = search(&snippets, "web");
        let mut found = ids(&results);
        found.sort();
        assert_eq!(found, vec!["C", "D"]);
        assert!(results.iter().all(|r| r.score >= TAG_MATCH_SCORE));
        assert_descending(&results);

        let d = results.iter().find(|r| r.snippet.id == "D").unwrap();
        assert_eq!(d.score, TAG_MATCH_SCORE + BODY_MATCH_SCORE);
    }

    #[test]
    fn title_beats_body_only_match() {
        let results = search(&scenario(), "programming");
        assert_eq!(ids(&results), vec!["A", "B"]);
        assert!(results[0].score >= TAG_MATCH_SCORE);
        assert_eq!(results[1].score, BODY_MATCH_SCORE);
    }

    #[test]
    fn empty_query_returns_everything_with_zero_score() {
        let snippets = scenario();
        let results = search(&snippets, "");
        assert_eq!(results.len(), snippets.len());
        assert!(results.iter().all(|r| r.score == 0));

        let blank = search(&snippets, "   ");
        assert_eq!(blank.len(), snippets.len());
    }

    #[test]
    fn empty_candidate_set_yields_nothing() {
        assert!(search(&[], "anything").is_empty());
        assert!(search(&[], "").is_empty());
        assert!(search(&scenario(), "nonexistent").is_empty());
    }

    #[test]
    fn substring_scores_add_up() {
        let snippets = vec![
            snippet("title-match", "test query", &[], "", "some content"),
            snippet("tag-match", "Other Title", &["test"], "", "some content"),
            snippet("body-match", "Other Title", &[], "", "test query content"),
            snippet("tag-body-match", "Other Title", &["test"], "", "test query content"),
        ];
        let results = search(&snippets, "test");
        assert_eq!(results.len(), 4);
        assert_descending(&results);

        let score = |id: &str| results.iter().find(|r| r.snippet.id == id).unwrap().score;
        assert!(score("title-match") > 0);
        assert_eq!(score("tag-match"), 10);
        assert_eq!(score("body-match"), 5);
        assert_eq!(score("tag-body-match"), 15);
    }

    #[test]
    fn title_match_is_not_rescored() {
        let snippets = vec![snippet("only", "test", &["test"], "", "test content")];
        let results = search(&snippets, "test");
        assert_eq!(results.len(), 1);
        assert!(results[0].score > 0);
    }

    #[test]
    fn fuzzy_tolerates_missing_letters_and_case() {
        let snippets = vec![
            snippet("js", "JavaScript Basics", &[], "", ""),
            snippet("py", "Python Tutorial", &[], "", ""),
        ];
        assert_eq!(ids(&search(&snippets, "Javascrpt")), vec!["js"]);
        assert_eq!(ids(&search(&snippets, "python")), vec!["py"]);
    }

    #[test]
    fn title_match_needs_query_in_order() {
        let snippets = vec![
            snippet("B", "Python Tutorial", &["python", "tutorial"], "", "Learn Python programming"),
            snippet("X", "Deploy script for web", &[], "", ""),
        ];
        assert!(search(&snippets, "Tutorial Python").is_empty());
        assert!(search(&snippets, "web deploy").is_empty());

        assert_eq!(ids(&search(&snippets, "python tut")), vec!["B"]);
        assert_eq!(ids(&search(&snippets, "deploy web")), vec!["X"]);
    }

    #[test]
    fn substring_stage_uses_query_as_given() {
        let snippets = vec![snippet("T", "Other", &["golang"], "", "go")];
        assert!(search(&snippets, "go ").is_empty());
        assert_eq!(search(&snippets, "go")[0].score, TAG_MATCH_SCORE + BODY_MATCH_SCORE);
    }

    #[test]
    fn contiguous_beats_scattered() {
        let snippets = vec![
            snippet("scattered", "axxbxxc", &[], "", ""),
            snippet("contiguous", "abc", &[], "", ""),
        ];
        let results = search(&snippets, "abc");
        assert_eq!(ids(&results), vec!["contiguous", "scattered"]);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn equal_scores_keep_candidate_order() {
        let snippets = vec![
            snippet("1", "Alpha", &["shared"], "", ""),
            snippet("2", "Beta", &["shared"], "", ""),
            snippet("3", "Gamma", &["shared"], "", ""),
        ];
        let results = search(&snippets, "shared");
        assert_eq!(ids(&results), vec!["1", "2", "3"]);
    }

    #[test]
    fn duplicate_titles_are_ranked_separately() {
        let snippets = vec![
            snippet("1", "Deploy", &[], "", ""),
            snippet("2", "Deploy", &[], "", ""),
        ];
        assert_eq!(search(&snippets, "deploy").len(), 2);
    }

    #[test]
    fn tag_filter_is_and() {
        let snippets = vec![snippet("x", "Server", &["go", "web"], "", "")];
        let both = SearchOptions::new().tag("go").tag("web");
        assert_eq!(rank(&snippets, &both).len(), 1);

        let missing = SearchOptions::new().tag("go").tag("api");
        assert!(rank(&snippets, &missing).is_empty());

        let upper = SearchOptions::new().tag("Go").tag("WEB");
        assert_eq!(rank(&snippets, &upper).len(), 1);
    }

    #[test]
    fn language_filter_ignores_case() {
        let snippets = vec![
            snippet("py", "Script", &[], "Python", ""),
            snippet("sh", "Script", &[], "bash", ""),
            snippet("none", "Script", &[], "", ""),
        ];
        assert_eq!(
            ids(&rank(&snippets, &SearchOptions::new().language("python"))),
            vec!["py"]
        );
        assert_eq!(
            ids(&rank(&snippets, &SearchOptions::new().language("BASH"))),
            vec!["sh"]
        );
        assert!(rank(&snippets, &SearchOptions::new().language("ruby")).is_empty());
    }

    #[test]
    fn filters_apply_before_query() {
        let snippets = vec![
            snippet("1", "Go Web Server", &["go", "web"], "go", "Building web servers in Go"),
            snippet("2", "Python Script", &["python", "automation"], "python", "Automation script in Python"),
            snippet("3", "Bash Deploy", &["bash", "devops", "deploy"], "bash", "Deployment script using bash"),
            snippet("4", "Go API", &["go", "api"], "go", "REST API in Go"),
            snippet("5", "Docker Setup", &["docker", "devops"], "bash", "Docker configuration"),
        ];

        let opts = SearchOptions::new().query("API").tag("go");
        assert_eq!(ids(&rank(&snippets, &opts)), vec!["4"]);

        let opts = SearchOptions::new().query("deploy").tag("devops").language("bash");
        assert_eq!(ids(&rank(&snippets, &opts)), vec!["3"]);

        let opts = SearchOptions::new().tag("devops").language("bash");
        let results = rank(&snippets, &opts);
        assert_eq!(ids(&results), vec!["3", "5"]);
        assert!(results.iter().all(|r| r.score == 0));

        let opts = SearchOptions::new().query("test").tag("go").language("python");
        assert!(rank(&snippets, &opts).is_empty());
    }

    #[test]
    fn matches_helpers() {
        let s = snippet("x", "t", &["Go", "Web"], "", "");
        assert!(matches_tags(&s, &[]));
        assert!(matches_tags(&s, &["go".into(), "web".into()]));
        assert!(!matches_tags(&s, &["go".into(), "api".into()]));
        assert!(matches_language(&s, ""));
        assert!(!matches_language(&s, "go"));
    }
}
