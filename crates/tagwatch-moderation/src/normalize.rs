/// Prepares text for the sentiment scorer.
///
/// Tokens starting with `@` are dropped. In the remaining tokens every `#`
/// is removed, every other `@` becomes `a`, and the result is lowercased.
/// Tokens are rejoined with single spaces. The output is never displayed.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for token in text.split_whitespace() {
        if token.starts_with('@') {
            continue;
        }

        let cleaned: String = token
            .chars()
            .filter(|c| *c != '#')
            .map(|c| if c == '@' { 'a' } else { c })
            .flat_map(char::to_lowercase)
            .collect();

        if cleaned.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&cleaned);
    }

    out
}
