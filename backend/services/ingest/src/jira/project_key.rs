use super::models::ApiBoardLocation;

pub const UNKNOWN_PROJECT_KEY: &str = "UNKNOWN";

/// Resolve a board's project key.
///
/// The board's location wins when it carries a key. Otherwise the key is guessed from the
/// board name, falling back to [`UNKNOWN_PROJECT_KEY`]. The guess is best effort: a board
/// named after a person or team will not yield a real key.
pub fn resolve_project_key(location: Option<&ApiBoardLocation>, board_name: &str) -> String {
    let from_location = location.and_then(|loc| {
        [loc.project_key.as_deref(), loc.key.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|k| !k.is_empty())
    });

    if let Some(key) = from_location {
        return key.to_string();
    }

    guess_from_name(board_name).unwrap_or_else(|| UNKNOWN_PROJECT_KEY.to_string())
}

/// `"KEY - Name"`, `"KEY: Name"`, a leading key-shaped token, then the capitals of the name.
pub fn guess_from_name(name: &str) -> Option<String> {
    let name = name.trim();

    for separator in [" - ", ":"] {
        if let Some((head, _)) = name.split_once(separator) {
            let head = head.trim();
            if looks_like_project_key(head) {
                return Some(head.to_string());
            }
        }
    }

    if let Some(first) = name.split_whitespace().next() {
        if looks_like_project_key(first) {
            return Some(first.to_string());
        }
    }

    let initials: String = name.chars().filter(char::is_ascii_uppercase).collect();
    (2..=6).contains(&initials.len()).then_some(initials)
}

/// An uppercase letter followed by 1 to 9 uppercase letters or digits.
fn looks_like_project_key(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_uppercase());
    starts_with_letter
        && (2..=10).contains(&candidate.len())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}
