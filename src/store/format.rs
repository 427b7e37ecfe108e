//! Descriptor text format: one provider per line, `#` comments allowed on
//! read, canonical sorted output on write.

use std::collections::BTreeSet;

pub fn parse(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut providers = Vec::new();
    for line in text.lines() {
        let entry = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();
        if entry.is_empty() {
            continue;
        }
        if seen.insert(entry) {
            providers.push(entry.to_string());
        }
    }
    providers
}

/// Whether `name` survives a render/parse cycle as exactly one line.
pub fn is_provider_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('#') && !name.chars().any(char::is_whitespace)
}

pub fn render<'a, I>(providers: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let sorted: BTreeSet<&str> = providers
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let mut out = String::new();
    for provider in sorted {
        out.push_str(provider);
        out.push('\n');
    }
    out
}
