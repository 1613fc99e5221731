use scraper::{Html, Selector};
use serde_json::Value;

/// All JSON-LD objects in the document, with top-level arrays and `@graph` lists flattened.
fn ld_objects(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();

    if let Ok(script_selector) = Selector::parse("script[type='application/ld+json']") {
        for script in document.select(&script_selector) {
            if let Ok(json) = serde_json::from_str::<Value>(script.text().collect::<String>().trim()) {
                flatten_into(json, &mut objects);
            }
        }
    }

    objects
}

fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Value::Object(mut obj) => {
            if let Some(graph) = obj.remove("@graph") {
                flatten_into(graph, out);
            }
            out.push(Value::Object(obj));
        }
        _ => {}
    }
}

fn first_string(document: &Html, key: &str) -> Option<String> {
    ld_objects(document)
        .iter()
        .filter_map(|obj| obj.get(key).and_then(|v| v.as_str()))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

/// `articleBody` from the first NewsArticle-like JSON-LD block that has one.
pub fn extract_article_body(document: &Html) -> Option<String> {
    first_string(document, "articleBody")
}

pub fn extract_headline(document: &Html) -> Option<String> {
    first_string(document, "headline")
}

pub fn extract_date_published(document: &Html) -> Option<String> {
    first_string(document, "datePublished")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_graph() {
        let html = r#"
            <html><head>
            <script type="application/ld+json">
            {"@context": "https://schema.org", "@graph": [
                {"@type": "WebPage", "name": "page"},
                {"@type": "NewsArticle", "headline": " Big News ", "datePublished": "2025-03-01T10:00:00Z",
                 "articleBody": "Body text of the article."}
            ]}
            </script>
            </head><body></body></html>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(extract_headline(&document).as_deref(), Some("Big News"));
        assert_eq!(extract_date_published(&document).as_deref(), Some("2025-03-01T10:00:00Z"));
        assert_eq!(extract_article_body(&document).as_deref(), Some("Body text of the article."));
    }

    #[test]
    fn test_invalid_json_is_ignored() {
        let html = r#"
            <script type="application/ld+json">{ not json </script>
            <script type="application/ld+json">[{"articleBody": "From array"}]</script>
        "#;
        let document = Html::parse_document(html);
        assert_eq!(extract_article_body(&document).as_deref(), Some("From array"));
        assert!(extract_headline(&document).is_none());
    }
}
