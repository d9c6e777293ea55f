//! Prompt templates for planning, report writing and direct answers

use super::types::ReportType;

/// System prompt for every research-pipeline call
pub const RESEARCH_SYSTEM_PROMPT: &str = "You are a critical-thinking research assistant. \
Your only job is to write objective, well-organized and well-argued reports from the material you are given.";

/// System prompt for direct answers without a research pass
pub const ASSISTANT_SYSTEM_PROMPT: &str = r#"You are Delve, a careful research assistant.

Answer clearly and accurately:
- Structure long answers with headings, lists or code blocks where they help.
- Separate established facts from uncertain or contested claims.
- Keep the answer focused on what was asked and suggest where to look next.
- For technical questions, explain the approach before the details and include runnable examples.
- For research questions, summarize the key findings, compare perspectives and state a reasoned conclusion."#;

/// Directives appended to every report prompt
pub const QUALITY_DIRECTIVES: &str = "

Please ensure your report:
1. Thoroughly covers all subtopics identified in the research
2. Provides in-depth analysis of each area
3. Creates a comprehensive, well-structured document
4. Includes specific examples and evidence from the research
5. Aims for substantial depth in each section
";

/// Ask the model for 8-10 search queries as a flat JSON object
pub fn search_queries_prompt(question: &str) -> String {
    format!(
        r#"You are an expert research assistant who writes web search queries.

QUESTION TO RESEARCH: {question}

Write 8-10 specific and varied search queries that together would gather comprehensive information on this question.

Respond with ONLY a JSON object of this exact shape:
{{
  "Q1": "first search query",
  "Q2": "second search query",
  "Q3": "third search query"
}}

Guidelines:
1. Use the domain's own terminology and keywords
2. Cover different aspects of the question
3. Favour recent information where it matters
4. Include background, current developments and future trends
5. Include critiques or opposing viewpoints when relevant
6. Ask for data, statistics or case studies where appropriate

No explanations or text outside the JSON object."#
    )
}

/// Ask the model for subtopics with their own search queries
pub fn subtopics_prompt(question: &str, max_subtopics: usize, max_queries: usize) -> String {
    format!(
        r#"You are planning a comprehensive investigation of: "{question}"

Identify up to {max_subtopics} important subtopics that must be explored to understand this subject.
For each subtopic give a short title and {max_queries} or fewer focused web search queries.

Respond with ONLY a JSON object of this shape:
{{
  "subtopic_1": {{
    "title": "Title of the first subtopic",
    "queries": ["query one", "query two"]
  }},
  "subtopic_2": {{
    "title": "Title of the second subtopic",
    "queries": ["query one", "query two"]
  }}
}}

Cover different perspectives, approaches and dimensions of the topic."#
    )
}

/// Render the report prompt for `report_type`
pub fn report_prompt(
    report_type: ReportType,
    question: &str,
    corpus: &str,
    extra_instructions: &str,
) -> String {
    match report_type {
        ReportType::Research => research_report_prompt(question, corpus, extra_instructions),
        ReportType::Resource => resource_report_prompt(question, corpus, extra_instructions),
        ReportType::Outline => outline_report_prompt(question, corpus, extra_instructions),
        ReportType::Deep => deep_research_prompt(question, corpus, extra_instructions),
    }
}

fn research_report_prompt(question: &str, corpus: &str, extra: &str) -> String {
    format!(
        r#"ROLE: Senior researcher and report writer.

TASK: Write a comprehensive, referenced research report on: "{question}"

AUDIENCE: Academic peers, policymakers and practitioners.

STYLE: Formal tone, APA citations, clear headings and subheadings. Describe tables or charts where data calls for them.

STRUCTURE:
1. Executive Summary: purpose, method, major findings and implications.
2. Introduction: background, research question, objectives and scope.
3. Literature Review: theoretical frameworks, historical development, key debates.
4. Analysis: four subsections on the major subtopics, each with evidence, case studies and quantitative findings.
5. Critical Evaluation: source reliability, competing interpretations, research gaps.
6. Practical Applications: real-world relevance, industry use and future projections.
7. Ethical Considerations: main challenges with guidelines and solutions.
8. Conclusion: synthesize the insights and answer the research question.
9. References.

SOURCE MATERIALS:
{corpus}

ADDITIONAL INSTRUCTIONS:
{extra}

Write every section in full. Do not summarize sections prematurely."#
    )
}

fn resource_report_prompt(question: &str, corpus: &str, extra: &str) -> String {
    format!(
        r#"Based on the following research materials:

"""{corpus}"""

Write a bibliographic analysis report for the research question: "{question}"

Structure:
1. An executive summary of the source landscape.
2. Sources grouped by methodology, theoretical approach or chronology.
3. For each source: full APA citation, credibility assessment, methodology, key findings, limitations or biases, and relevance to the question.

Close with an overall assessment: gaps in the literature, methodological strengths and weaknesses across sources, resources that would complement this set, and how the sources collectively answer the question.

Use Markdown headings and bullet points. Keep the tone scholarly and critical.

{extra}"#
    )
}

fn outline_report_prompt(question: &str, corpus: &str, extra: &str) -> String {
    format!(
        r#"Based on the following research materials:

"""{corpus}"""

Write a detailed research outline for a comprehensive report on: "{question}"

The outline must:
1. Use a Markdown hierarchy (##, ###, ####).
2. Include abstract, introduction, literature review, theoretical framework, methodology, findings, discussion, implications, limitations, future research, conclusion and references.
3. For each section give a short description, the key points and evidence, the relevant sources from the materials, and suggested tables or figures.
4. Annotate connections between sections, open problems and contradictory evidence.

It should be detailed enough for another researcher to write a 5,000+ word paper from it.

{extra}"#
    )
}

fn deep_research_prompt(question: &str, corpus: &str, extra: &str) -> String {
    format!(
        r#"## In-depth research analysis: "{question}"

Produce an interdisciplinary analysis at the standard of a leading academic publication:

1. Systematic literature review: search strategy, inclusion criteria and synthesis across qualitative and quantitative work.
2. Theoretical frameworks: the major models, their historical evolution and where they conflict.
3. Interdisciplinary integration: perspectives from several disciplines and where they converge or diverge.
4. Methodology: the research designs used in the field, their validity and their blind spots.
5. Critical appraisal: criteria for source quality, systemic biases and contradictory findings.
6. Current debates and future directions with concrete research proposals.
7. Practical applications with detailed case studies and barriers to adoption.
8. Ethical, legal and social considerations.
9. Limitations and transparency of the existing evidence.

Use precise terminology, support every argument with evidence from the materials, and include a glossary of key terms.

**Research Summary:**
{corpus}

{extra}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_report_type_embeds_inputs() {
        for report_type in ReportType::ALL {
            let prompt = report_prompt(report_type, "Why do bees dance?", "CORPUS-MARK", "EXTRA-MARK");
            assert!(prompt.contains("Why do bees dance?"), "{}", report_type);
            assert!(prompt.contains("CORPUS-MARK"), "{}", report_type);
            assert!(prompt.contains("EXTRA-MARK"), "{}", report_type);
        }
    }

    #[test]
    fn test_query_prompt_asks_for_json() {
        let prompt = search_queries_prompt("remote work");
        assert!(prompt.contains("QUESTION TO RESEARCH: remote work"));
        assert!(prompt.contains("\"Q1\": \"first search query\""));
    }
}
