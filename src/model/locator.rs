use crate::config;

pub fn is_valid_track_uri(uri: &str) -> bool {
    config::TRACK_URI_RE.is_match(uri)
}

/// Input in none of those forms is returned unchanged so the lookup that
/// follows fails loudly instead of silently targeting something else.
pub fn normalize_id(input: &str) -> String {
    let trimmed = input.trim();
    if config::BARE_ID_RE.is_match(trimmed) {
        return trimmed.to_string();
    }
    config::SCHEME_URI_RE
        .captures(trimmed)
        .or_else(|| config::WEB_URL_RE.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "37i9dQZF1DXcBWIGoYBM5M";

    #[test]
    fn all_accepted_forms_normalize_to_the_same_id() {
        let forms = [
            ID.to_string(),
            format!("spotify:playlist:{}", ID),
            format!("https://open.spotify.com/playlist/{}", ID),
            format!("https://open.spotify.com/playlist/{}?si=abc123", ID),
            format!("https://open.spotify.com/intl-de/playlist/{}", ID),
            format!("  {}  ", ID),
        ];
        for form in forms {
            assert_eq!(normalize_id(&form), ID, "form: {}", form);
        }
    }

    #[test]
    fn unrecognized_input_passes_through_unchanged() {
        assert_eq!(normalize_id("my favourite list"), "my favourite list");
        assert_eq!(normalize_id("spotify:playlist:short"), "spotify:playlist:short");
        assert_eq!(
            normalize_id("https://example.com/playlist/37i9dQZF1DXcBWIGoYBM5M"),
            "https://example.com/playlist/37i9dQZF1DXcBWIGoYBM5M"
        );
    }

    #[test]
    fn track_uri_validation_is_strict() {
        assert!(is_valid_track_uri("spotify:track:4uLU6hMCjMI75M1A2tKUQC"));
        assert!(!is_valid_track_uri("spotify:local:Artist:Album:Song:215"));
        assert!(!is_valid_track_uri("spotify:episode:4uLU6hMCjMI75M1A2tKUQC"));
        assert!(!is_valid_track_uri("spotify:track:4uLU6hMCjMI75M1A2tKUQ"));
        assert!(!is_valid_track_uri(" spotify:track:4uLU6hMCjMI75M1A2tKUQC"));
        assert!(!is_valid_track_uri(""));
    }
}
