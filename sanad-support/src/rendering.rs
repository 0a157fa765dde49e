//! Text rendering for resolution diagnostics.
//!
//! Type names coming out of [`std::any::type_name`] are long and noisy
//! (`dyn my_app::services::mail::MailSender + Send + Sync`). The helpers
//! here shorten them and lay resolution chains out on one line.

/// Renders a resolution chain with every entry shortened.
///
/// # Examples
/// ```
/// use sanad_support::rendering::render_chain;
///
/// let chain = ["app::Mailer", "app::Smtp", "app::Mailer"];
/// assert_eq!(render_chain(&chain), "Mailer → Smtp → Mailer");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|name| shorten_type_name(name.as_ref()))
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders a bulleted list, one shortened name per line.
///
/// Each line is prefixed with `indent` and `- `.
pub fn render_list(names: &[impl AsRef<str>], indent: usize) -> String {
    let pad = " ".repeat(indent);
    names
        .iter()
        .map(|name| format!("{pad}- {}", shorten_type_name(name.as_ref())))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use sanad_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::mail::Smtp"), "Smtp");
/// assert_eq!(
///     shorten_type_name("alloc::vec::Vec<alloc::sync::Arc<dyn app::Sender>>"),
///     "Vec<Arc<dyn Sender>>"
/// );
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Picks registered names that look like what was requested.
///
/// Scores by substring containment first, then by the short name, then by
/// common prefix of the short names (at least three characters). At most
/// `max_suggestions` names are returned, best first; the requested name
/// itself is never suggested.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|&&name| name != requested)
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = shorten_type_name(name).to_lowercase();

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short) || requested_short.contains(&name_short) {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            (common >= 3).then_some((name, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.dedup_by(|a, b| a.0 == b.0);
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}
