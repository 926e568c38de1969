use reqwest::Url;

/// Parse "true"/"false"/"1"/"0" (and yes/no, on/off) from a flag value.
pub fn parse_bool_str(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Returns true for localhost, loopback IPv4/IPv6, and 0.0.0.0 URLs.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    match parsed.host_str() {
        Some(host) => {
            let normalized = host.trim().to_ascii_lowercase();
            normalized == "localhost"
                || normalized == "::1"
                || normalized == "0.0.0.0"
                || normalized.starts_with("127.")
        }
        None => false,
    }
}

/// Format whole seconds as MM:SS for the turn clock.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_helpers() {
        assert_eq!(parse_bool_str("true"), Some(true));
        assert_eq!(parse_bool_str("0"), Some(false));
        assert_eq!(parse_bool_str("YES"), Some(true));
        assert_eq!(parse_bool_str("off"), Some(false));
        assert_eq!(parse_bool_str("maybe"), None);
    }

    #[test]
    fn test_is_local_endpoint_url_normalizes_case_and_space() {
        assert!(is_local_endpoint_url(" HTTP://LOCALHOST:3000/health "));
        assert!(is_local_endpoint_url("https://127.0.0.1/v1/messages"));
        assert!(is_local_endpoint_url("https://0.0.0.0/v1/messages"));
        assert!(!is_local_endpoint_url(
            "https://evil-localhost.com/v1/messages"
        ));
        assert!(!is_local_endpoint_url(
            "https://api.anthropic.com/v1/messages"
        ));
    }

    #[test]
    fn test_format_elapsed_pads_minutes_and_seconds() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(65), "01:05");
        assert_eq!(format_elapsed(600), "10:00");
    }
}
