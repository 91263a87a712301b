//! Minimal server-rendered page for the browser form.

use axum::response::Html;

/// What the page shows below the form.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    /// Fresh page.
    Empty,
    /// Successful prediction.
    Verdict {
        /// `"Real News"` or `"Fake News"`.
        label: &'static str,
        /// Percentage, already rounded.
        confidence: f64,
    },
    /// User-facing error text.
    Message(String),
}

pub(crate) fn render(model_ready: bool, outcome: &Outcome) -> Html<String> {
    let status = if model_ready {
        r#"<p class="status ready">Model status: READY</p>"#
    } else {
        r#"<p class="status not-ready">Model status: NOT LOADED (run <code>cargo run --release --bin train</code>)</p>"#
    };
    let result = match outcome {
        Outcome::Empty => String::new(),
        Outcome::Verdict { label, confidence } => format!(
            r#"<section class="result"><h2>{}</h2><p>Confidence: {confidence:.2}%</p></section>"#,
            escape(label)
        ),
        Outcome::Message(message) => {
            format!(r#"<section class="result error"><p>{}</p></section>"#, escape(message))
        }
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Fake News Detector</title>
</head>
<body>
<h1>Fake News Detector</h1>
{status}
<form method="post" action="/predict">
<textarea name="news_text" rows="12" cols="80" placeholder="Paste a news article here"></textarea>
<br>
<button type="submit">Check article</button>
</form>
{result}
</body>
</html>
"#
    ))
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
