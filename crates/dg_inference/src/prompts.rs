//! Prompt builders. The text under analysis is always fenced by `"""` so offline
//! models can find it again.

pub const FENCE: &str = "\"\"\"";

pub fn fenced(text: &str) -> String {
    format!("{FENCE}\n{text}\n{FENCE}")
}

/// The text between the first and the last fence, if the prompt has one.
pub fn unfence(prompt: &str) -> Option<&str> {
    let start = prompt.find(FENCE)? + FENCE.len();
    let end = prompt.rfind(FENCE)?;
    (start <= end).then(|| prompt[start..end].trim())
}

pub fn summary(article_text: &str) -> String {
    format!(
        "You are a world-class news summarizer. Write an extremely concise, informative summary \
         of the article text below.\n\n\
         Requirements:\n\
         - exactly one complete sentence\n\
         - focus on the main event, decision, or outcome\n\
         - neutral, factual tone\n\n\
         Article text:\n{}\n\n\
         Summary (one complete sentence):",
        fenced(article_text)
    )
}

pub fn combine_summaries(chunk_summaries: &[String]) -> String {
    format!(
        "You are a news summarizer. Merge these partial summaries of one article into a single \
         comprehensive sentence.\n\n\
         Partial summaries:\n{}\n\n\
         Final one-sentence summary:",
        fenced(&chunk_summaries.join(" "))
    )
}

pub fn sentiment(summary_text: &str) -> String {
    format!(
        "You are an expert sentiment analyst for news content. Classify the sentiment of the \
         one-sentence news summary below.\n\n\
         sentiment must be one of: positive, negative, neutral, mixed.\n\
         confidence must be one of: high, medium, low.\n\
         reason is one short sentence.\n\n\
         Summary:\n{}\n\n\
         Return ONLY JSON: {{\"sentiment\": \"...\", \"confidence\": \"...\", \"reason\": \"...\"}}",
        fenced(summary_text)
    )
}

pub const INSIGHTS_SYSTEM: &str = "You are an analyst generating concise, actionable insights from news articles. \
     Read the full article text and produce 3-5 bullet insights focused on decisions, risks, opportunities, and next steps. \
     Return JSON with keys: insights (list of strings), categories (list of strings), confidence (high|medium|low), \
     rationale (short string). Be concrete and avoid generic statements.";

pub fn insights(title: &str, source: &str, article_text: &str) -> String {
    format!(
        "Title: {}\n\nSource: {}\n\nFull article:\n{}\n\nRespond with ONLY the JSON.",
        title,
        source,
        fenced(article_text)
    )
}
