use ratatui::{
    style::Stylize,
    text::{Line, Span, Text},
};

#[derive(Debug, Clone)]
pub struct UsageInfoLine {
    pub keys: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct UsageInfo {
    pub description: Option<String>,
    pub lines: Vec<UsageInfoLine>,
}

pub trait HasUsageInfo {
    fn usage_info(&self) -> UsageInfo;
}

fn key_to_span<'a>(key: &str) -> Span<'a> {
    Span::from(format!("({})", key)).bold()
}

pub fn widget_usage_to_text<'a>(usage: UsageInfo) -> Text<'a> {
    let mut lines: Vec<Line> = vec![];
    if let Some(description) = usage.description {
        lines.push(Line::from(description));
    }

    for line in usage.lines {
        let mut bindings: Vec<Span> = match line.keys.as_slice() {
            [] => vec![],
            [only] => vec![key_to_span(only)],
            [first, second] => vec![key_to_span(first), " or ".into(), key_to_span(second)],
            [rest @ .., last] => {
                let mut bindings: Vec<Span> = Vec::with_capacity(line.keys.len() * 2);

                for key in rest {
                    bindings.push(key_to_span(key));
                    bindings.push(", ".into());
                }

                bindings.push("or ".into());
                bindings.push(key_to_span(last));

                bindings
            }
        };

        bindings.push(Span::from(format!(" {}", line.description)));

        lines.push(Line::from(bindings));
    }

    Text::from(lines)
}
