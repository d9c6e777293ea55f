//! Query planning: question to search queries and subtopics
//!
//! The model is asked for structured JSON. Its answer goes through a chain of
//! pure parsers: structured parse, then a line scanner, then a deterministic
//! generic set, so planning always yields something to search for.

use super::templates::{search_queries_prompt, subtopics_prompt, RESEARCH_SYSTEM_PROMPT};
use delve_core::{Message, ModelCallRequest, ResearchQuery, ResearchSettings, Subtopic};
use delve_llm::ModelInvoker;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").unwrap())
}

fn query_line_regex() -> &'static Regex {
    static QUERY_LINE: OnceLock<Regex> = OnceLock::new();
    QUERY_LINE.get_or_init(|| Regex::new(r#"^["']?(Q\d+)["']?\s*:\s*(.*)$"#).unwrap())
}

fn subtopic_line_regexes() -> &'static (Regex, Regex, Regex) {
    static SUBTOPIC_LINES: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    SUBTOPIC_LINES.get_or_init(|| {
        (
            Regex::new(r#""(subtopic_\d+)"\s*:"#).unwrap(),
            Regex::new(r#""title"\s*:\s*"?([^"]*)"?"#).unwrap(),
            Regex::new(r#""queries"\s*:\s*\[(.*?)\]"#).unwrap(),
        )
    })
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    fence_regex()
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
        .map(|inner| inner.as_str())
        .unwrap_or(trimmed)
}

/// Slice from the first `{` to the last `}`
fn json_object_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn clean_scalar(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(',')
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Tier 1: a JSON object of `id: query` pairs, in document order
pub fn parse_query_object(response: &str) -> Option<Vec<ResearchQuery>> {
    let body = json_object_slice(strip_code_fences(response))?;
    let object = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => object,
        Ok(_) => return None,
        Err(e) => {
            debug!("Planner response is not valid JSON: {}", e);
            return None;
        }
    };

    let queries: Vec<ResearchQuery> = object
        .into_iter()
        .filter_map(|(id, value)| match value {
            Value::String(text) if !text.trim().is_empty() => {
                Some(ResearchQuery::new(id, text.trim()))
            }
            _ => None,
        })
        .collect();

    (!queries.is_empty()).then_some(queries)
}

/// Tier 2: scan `Qn: text` lines
///
/// Quotes around keys and values and trailing commas are ignored. A repeated
/// key replaces the earlier value in place.
pub fn scan_query_lines(response: &str) -> Vec<ResearchQuery> {
    let mut queries: Vec<ResearchQuery> = Vec::new();

    for line in response.lines() {
        let Some(captures) = query_line_regex().captures(line.trim()) else {
            continue;
        };
        let id = &captures[1];
        let text = clean_scalar(&captures[2]);
        if text.is_empty() {
            continue;
        }

        match queries.iter_mut().find(|query| query.id == id) {
            Some(existing) => existing.text = text,
            None => queries.push(ResearchQuery::new(id, text)),
        }
    }

    queries
}

/// Tier 3: generic queries templated from the question
pub fn fallback_queries(question: &str) -> Vec<ResearchQuery> {
    let question = question.trim();
    [
        format!("General overview of {} research trends", question),
        format!("Historical development of {} over past three decades", question),
        format!("Quantitative analysis related to {}", question),
        format!("Case studies on practical applications of {}", question),
        format!("Ethical challenges in {}", question),
        format!("{} future", question),
        format!("{} applications", question),
        format!("{} research", question),
    ]
    .into_iter()
    .enumerate()
    .map(|(index, text)| ResearchQuery::new(format!("Q{}", index + 1), text.trim()))
    .collect()
}

/// Run the full tier chain over a model response
pub fn queries_from_response(
    response: Option<&str>,
    question: &str,
    max_queries: usize,
) -> Vec<ResearchQuery> {
    let mut queries = response
        .and_then(|text| {
            parse_query_object(text).or_else(|| {
                debug!("Structured parse failed, scanning response lines");
                let scanned = scan_query_lines(text);
                (!scanned.is_empty()).then_some(scanned)
            })
        })
        .unwrap_or_else(|| {
            info!("Using generic fallback queries");
            fallback_queries(question)
        });

    queries.truncate(max_queries.max(1));
    queries
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Tier 1 for subtopics: `{"subtopic_n": {"title", "queries": [...]}}`
pub fn parse_subtopic_object(response: &str) -> Option<Vec<Subtopic>> {
    let body = json_object_slice(strip_code_fences(response))?;
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) else {
        return None;
    };

    let subtopics: Vec<Subtopic> = object
        .into_iter()
        .filter_map(|(id, value)| {
            let title = value
                .get("title")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .unwrap_or(&id)
                .to_string();
            let queries = value.get("queries").map(string_list).unwrap_or_default();
            (!queries.is_empty()).then_some(Subtopic { id, title, queries })
        })
        .collect();

    (!subtopics.is_empty()).then_some(subtopics)
}

/// Tier 2 for subtopics: scan `"subtopic_n"`, `"title"` and single-line
/// `"queries": [...]` lines
pub fn scan_subtopic_lines(response: &str) -> Vec<Subtopic> {
    let (key_re, title_re, queries_re) = subtopic_line_regexes();
    let mut subtopics: Vec<Subtopic> = Vec::new();

    for line in response.lines() {
        if let Some(captures) = key_re.captures(line) {
            let id = captures[1].to_string();
            subtopics.push(Subtopic {
                title: id.clone(),
                id,
                queries: Vec::new(),
            });
            continue;
        }

        let Some(current) = subtopics.last_mut() else {
            continue;
        };

        if let Some(captures) = title_re.captures(line) {
            let title = clean_scalar(&captures[1]);
            if !title.is_empty() {
                current.title = title;
            }
        } else if let Some(captures) = queries_re.captures(line) {
            current.queries = captures[1]
                .split(',')
                .map(clean_scalar)
                .filter(|query| !query.is_empty())
                .collect();
        }
    }

    subtopics.retain(|subtopic| !subtopic.queries.is_empty());
    subtopics
}

/// Tier 3 for subtopics: one general subtopic searching the question itself
///
/// A blank question searches the generic overview query instead.
pub fn fallback_subtopics(question: &str) -> Vec<Subtopic> {
    let question = question.trim();
    let query = if question.is_empty() {
        fallback_queries(question)
            .into_iter()
            .next()
            .map(|query| query.text)
            .unwrap_or_default()
    } else {
        question.to_string()
    };

    vec![Subtopic {
        id: "subtopic_1".to_string(),
        title: "General Information".to_string(),
        queries: vec![query],
    }]
}

/// Run the subtopic tier chain and apply the caps
pub fn subtopics_from_response(
    response: Option<&str>,
    question: &str,
    max_subtopics: usize,
    max_queries_per_subtopic: usize,
) -> Vec<Subtopic> {
    let mut subtopics = response
        .and_then(|text| {
            parse_subtopic_object(text).or_else(|| {
                let scanned = scan_subtopic_lines(text);
                (!scanned.is_empty()).then_some(scanned)
            })
        })
        .unwrap_or_else(|| fallback_subtopics(question));

    subtopics.truncate(max_subtopics.max(1));
    for subtopic in &mut subtopics {
        subtopic.queries.truncate(max_queries_per_subtopic.max(1));
    }
    subtopics
}

/// Flatten subtopics into tagged queries with ids like `subtopic_2/Q1`
pub fn subtopic_queries(subtopics: &[Subtopic]) -> Vec<ResearchQuery> {
    subtopics
        .iter()
        .flat_map(|subtopic| {
            subtopic.queries.iter().enumerate().map(move |(index, text)| {
                ResearchQuery::new(format!("{}/Q{}", subtopic.id, index + 1), text.as_str())
                    .with_subtopic(subtopic.title.as_str())
            })
        })
        .collect()
}

/// Turns a question into search queries using the model
pub struct QueryPlanner {
    invoker: Arc<ModelInvoker>,
    settings: ResearchSettings,
    temperature: f32,
}

impl QueryPlanner {
    pub fn new(invoker: Arc<ModelInvoker>, settings: &ResearchSettings, temperature: f32) -> Self {
        Self {
            invoker,
            settings: settings.clone(),
            temperature,
        }
    }

    async fn ask_model(&self, prompt: String) -> Option<String> {
        let request = ModelCallRequest::new(
            vec![Message::system(RESEARCH_SYSTEM_PROMPT), Message::user(prompt)],
            self.temperature,
        )
        .with_max_output_tokens(self.settings.planner_max_tokens);

        match self.invoker.try_complete(&request, None).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Planner model call failed: {}", e);
                None
            }
        }
    }

    /// Plan the main search queries for `question`; never empty
    pub async fn plan(&self, question: &str) -> Vec<ResearchQuery> {
        info!("Planning search queries for: {}", question);

        let response = self.ask_model(search_queries_prompt(question)).await;
        let queries =
            queries_from_response(response.as_deref(), question, self.settings.max_queries);

        debug!("Planned {} queries", queries.len());
        for query in &queries {
            debug!("  - {}: {}", query.id, query.text);
        }
        queries
    }

    /// Plan subtopics with their own queries; never empty
    pub async fn plan_subtopics(&self, question: &str) -> Vec<Subtopic> {
        info!("Planning subtopics for: {}", question);

        let prompt = subtopics_prompt(
            question,
            self.settings.max_subtopics,
            self.settings.max_queries_per_subtopic,
        );
        let response = self.ask_model(prompt).await;

        subtopics_from_response(
            response.as_deref(),
            question,
            self.settings.max_subtopics,
            self.settings.max_queries_per_subtopic,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_object_keeps_order() {
        let response = r#"{"Q2": "second", "Q1": "first", "Q3": ""}"#;
        let queries = parse_query_object(response).unwrap();
        let ids: Vec<&str> = queries.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["Q2", "Q1"]);
    }

    #[test]
    fn test_parse_query_object_tolerates_fences_and_prose() {
        let fenced = "```json\n{\"Q1\": \"remote work productivity studies\"}\n```";
        assert_eq!(parse_query_object(fenced).unwrap()[0].text, "remote work productivity studies");

        let chatty = "Sure! Here you go:\n{\"Q1\": \"a\", \"Q2\": \"b\"}\nHope it helps.";
        assert_eq!(parse_query_object(chatty).unwrap().len(), 2);

        assert!(parse_query_object("[\"Q1\"]").is_none());
        assert!(parse_query_object("{}").is_none());
    }

    #[test]
    fn test_scan_query_lines() {
        let response = r#"
Here are the queries
"Q1": "solar adoption 2025",
Q2: 'grid storage costs'
Q10: battery recycling
Q1: solar adoption statistics
Query: ignored
QX: ignored
"#;
        let queries = scan_query_lines(response);
        let pairs: Vec<(&str, &str)> = queries
            .iter()
            .map(|q| (q.id.as_str(), q.text.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Q1", "solar adoption statistics"),
                ("Q2", "grid storage costs"),
                ("Q10", "battery recycling"),
            ]
        );
    }

    #[test]
    fn test_fallback_is_deterministic_and_never_empty() {
        let first = queries_from_response(Some("I cannot help with that."), "coral reefs", 10);
        let second = queries_from_response(None, "coral reefs", 10);
        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
        assert_eq!(first[0].text, "General overview of coral reefs research trends");
        assert_eq!(first[7].text, "coral reefs research");

        let empty_question = queries_from_response(None, "", 10);
        assert!(!empty_question.is_empty());
        assert!(empty_question.iter().all(|q| !q.text.is_empty()));
    }

    #[test]
    fn test_query_cap() {
        let response = (1..=15)
            .map(|n| format!("Q{}: query {}", n, n))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(queries_from_response(Some(&response), "q", 10).len(), 10);
    }

    #[test]
    fn test_subtopic_object_parse_and_caps() {
        let response = r#"{
            "subtopic_1": {"title": "History", "queries": ["a", "b", "c", "d"]},
            "subtopic_2": {"title": "", "queries": ["e"]},
            "subtopic_3": {"title": "Empty", "queries": []}
        }"#;
        let subtopics = subtopics_from_response(Some(response), "q", 8, 3);
        assert_eq!(subtopics.len(), 2);
        assert_eq!(subtopics[0].queries, vec!["a", "b", "c"]);
        assert_eq!(subtopics[1].title, "subtopic_2");
    }

    #[test]
    fn test_subtopic_line_scanner() {
        // Trailing comma after the last entry breaks strict JSON
        let response = r#"{
  "subtopic_1": {
    "title": "Economic impact",
    "queries": ["remote work GDP", "office real estate"],
  },
  "subtopic_2": {
    "title": "Health",
    "queries": ["remote work burnout"]
  },
}"#;
        assert!(parse_subtopic_object(response).is_none());

        let subtopics = scan_subtopic_lines(response);
        assert_eq!(subtopics.len(), 2);
        assert_eq!(subtopics[0].title, "Economic impact");
        assert_eq!(subtopics[0].queries, vec!["remote work GDP", "office real estate"]);
        assert_eq!(subtopics[1].id, "subtopic_2");
    }

    #[test]
    fn test_subtopic_fallback() {
        let subtopics = subtopics_from_response(Some("no structure at all"), "deep sea mining", 8, 3);
        assert_eq!(subtopics, fallback_subtopics("deep sea mining"));
        assert_eq!(subtopics[0].title, "General Information");
        assert_eq!(subtopics[0].queries, vec!["deep sea mining"]);
    }

    #[test]
    fn test_subtopic_queries_are_tagged() {
        let queries = subtopic_queries(&[Subtopic {
            id: "subtopic_2".to_string(),
            title: "Health".to_string(),
            queries: vec!["burnout".to_string(), "ergonomics".to_string()],
        }]);
        assert_eq!(queries[1].id, "subtopic_2/Q2");
        assert_eq!(queries[1].subtopic.as_deref(), Some("Health"));
    }

    #[test]
    fn test_subtopic_fallback_never_searches_blank_text() {
        let subtopics = subtopics_from_response(None, "   ", 8, 3);
        assert_eq!(subtopics.len(), 1);
        assert_eq!(subtopics[0].queries, vec!["General overview of  research trends"]);

        let subtopics = subtopics_from_response(None, " deep sea mining ", 8, 3);
        assert_eq!(subtopics[0].queries, vec!["deep sea mining"]);
    }
}
