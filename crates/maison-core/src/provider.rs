use crate::config::BackendConfig;
use tracing::info;

/// Which backend the service talks to - decided once, at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Hosted REST backend (URL + API key)
    HostedRest,
    /// Direct Postgres connection
    Direct,
    /// No usable configuration; built-in data and the local store
    Mock,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::HostedRest => write!(f, "hosted-rest"),
            ProviderKind::Direct => write!(f, "direct"),
            ProviderKind::Mock => write!(f, "mock"),
        }
    }
}

/// Values that scream "nobody filled this in"
const PLACEHOLDER_MARKERS: &[&str] = &["your-", "your_", "placeholder", "example", "changeme", "xxx"];

/// Classify the configured backend
///
/// First match wins: a direct Postgres connection string beats everything,
/// then a complete URL + key pair means hosted REST, and anything else
/// lands on mock. Absence of configuration is not an error - the app must
/// stay usable without a backend, so this never fails.
pub fn classify(config: &BackendConfig) -> ProviderKind {
    let kind = classify_quiet(config);
    info!("Resolved data provider: {}", kind);
    kind
}

fn classify_quiet(config: &BackendConfig) -> ProviderKind {
    if let Some(conn) = &config.connection_string {
        if is_direct_postgres(conn) {
            return ProviderKind::Direct;
        }
    }

    match (&config.url, &config.api_key) {
        (Some(url), Some(key)) if is_usable(url) && is_usable(key) => ProviderKind::HostedRest,
        _ => ProviderKind::Mock,
    }
}

/// Does this look like a raw Postgres connection rather than an API URL?
fn is_direct_postgres(conn: &str) -> bool {
    let c = conn.trim().to_ascii_lowercase();
    if c.is_empty() {
        return false;
    }
    c.starts_with("postgres://") || c.starts_with("postgresql://") || c.contains(":5432")
}

fn is_usable(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    !v.is_empty() && !PLACEHOLDER_MARKERS.iter().any(|m| v.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        url: Option<&str>,
        key: Option<&str>,
        conn: Option<&str>,
    ) -> BackendConfig {
        BackendConfig {
            url: url.map(String::from),
            api_key: key.map(String::from),
            connection_string: conn.map(String::from),
        }
    }

    #[test]
    fn empty_config_is_mock() {
        assert_eq!(classify(&config(None, None, None)), ProviderKind::Mock);
    }

    #[test]
    fn complete_url_and_key_is_hosted_rest() {
        let c = config(
            Some("https://api.maison.market"),
            Some("sk-live-4f2a9"),
            None,
        );
        assert_eq!(classify(&c), ProviderKind::HostedRest);
    }

    #[test]
    fn postgres_connection_string_is_direct() {
        let c = config(None, None, Some("postgres://u:p@db.host:5432/maison"));
        assert_eq!(classify(&c), ProviderKind::Direct);

        let c = config(None, None, Some("postgresql://u:p@localhost/maison"));
        assert_eq!(classify(&c), ProviderKind::Direct);
    }

    #[test]
    fn direct_beats_hosted_rest() {
        let c = config(
            Some("https://api.maison.market"),
            Some("sk-live-4f2a9"),
            Some("postgres://u:p@db.host/maison"),
        );
        assert_eq!(classify(&c), ProviderKind::Direct);
    }

    #[test]
    fn placeholders_resolve_to_mock() {
        for key in ["your-api-key-here", "PLACEHOLDER", "xxx", "  ", ""] {
            let c = config(Some("https://api.maison.market"), Some(key), None);
            assert_eq!(classify(&c), ProviderKind::Mock, "key {:?}", key);
        }
        let c = config(Some("https://example.com"), Some("sk-live-4f2a9"), None);
        assert_eq!(classify(&c), ProviderKind::Mock);
    }

    #[test]
    fn url_without_key_is_mock() {
        let c = config(Some("https://api.maison.market"), None, None);
        assert_eq!(classify(&c), ProviderKind::Mock);
    }

    #[test]
    fn non_postgres_connection_string_is_ignored() {
        let c = config(None, None, Some("mysql://u:p@host/db"));
        assert_eq!(classify(&c), ProviderKind::Mock);
    }
}
