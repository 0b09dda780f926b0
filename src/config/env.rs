//! Environment placeholder substitution and secret masking.
//!
//! `${NAME}` placeholders in string values are replaced with the value of the
//! environment variable `NAME`. Unset variables leave the placeholder in place
//! so a misconfiguration shows up verbatim instead of as an empty string.

use regex::Regex;
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static placeholder regex"))
}

/// Substitute placeholders in every string of a parsed TOML document.
pub fn resolve_env_placeholders(value: &mut toml::Value) {
    resolve_with(value, &|name| std::env::var(name).ok());
}

/// Substitute placeholders using an arbitrary lookup.
pub fn resolve_with(value: &mut toml::Value, lookup: &dyn Fn(&str) -> Option<String>) {
    match value {
        toml::Value::String(s) => {
            *s = substitute(s, lookup);
        }
        toml::Value::Array(items) => {
            for item in items {
                resolve_with(item, lookup);
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                resolve_with(item, lookup);
            }
        }
        _ => {}
    }
}

fn substitute(input: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    placeholder_pattern()
        .replace_all(input, |caps: &regex::Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// True if the string still contains an unresolved `${...}` placeholder.
pub fn has_placeholder(input: &str) -> bool {
    placeholder_pattern().is_match(input)
}

/// Mask a secret for diagnostics: only the last four characters survive.
///
/// Short inputs are fully elided.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 10 {
        return ".....".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!(".....{}", tail)
}

/// `abcd.....wxyz` form for URL path segments.
fn obscure_segment(segment: &str) -> String {
    let chars: Vec<char> = segment.chars().collect();
    if chars.len() <= 10 {
        return segment.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}.....{}", head, tail)
}

/// Obscure long path segments of a URL (API keys embedded in RPC URLs).
///
/// Segments longer than ten characters become `abcd.....wxyz`.
pub fn obscure_url(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw) else {
        return mask_secret(raw);
    };

    let obscured: Vec<String> = url
        .path()
        .split('/')
        .map(obscure_segment)
        .collect();
    url.set_path(&obscured.join("/"));

    let mut out = url.to_string();
    // Url normalizes an empty path to "/"; keep the input's shape.
    if !raw.ends_with('/') && out.ends_with('/') && url.path() == "/" {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "INFURA_API_KEY" => Some("api_key_here".to_string()),
            "ALICE_PRIVATE_KEY" => Some("0xaaaa".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_resolves_nested_placeholders() {
        let mut value: toml::Value = toml::from_str(
            r#"
            [networks.sepolia]
            url = "https://sepolia.infura.io/v3/${INFURA_API_KEY}"
            chain_id = 11155111

            [accounts]
            alice = { address = "0xAlice", private_key = "${ALICE_PRIVATE_KEY}" }
            "#,
        )
        .unwrap();

        resolve_with(&mut value, &lookup);

        assert_eq!(
            value["networks"]["sepolia"]["url"].as_str(),
            Some("https://sepolia.infura.io/v3/api_key_here")
        );
        assert_eq!(value["networks"]["sepolia"]["chain_id"].as_integer(), Some(11155111));
        assert_eq!(value["accounts"]["alice"]["private_key"].as_str(), Some("0xaaaa"));
    }

    #[test]
    fn test_unresolved_placeholder_kept_literally() {
        let mut value = toml::Value::String("key=${MISSING_VAR_FOR_TEST}".to_string());
        resolve_with(&mut value, &lookup);
        assert_eq!(value.as_str(), Some("key=${MISSING_VAR_FOR_TEST}"));
        assert!(has_placeholder(value.as_str().unwrap()));
    }

    #[test]
    fn test_obscure_url() {
        assert_eq!(
            obscure_url("https://sepolia.infura.io/v3/api_key_here"),
            "https://sepolia.infura.io/v3/api_.....here"
        );
        assert_eq!(
            obscure_url("https://virtual.sepolia.rpc.tenderly.co/testnet_id_here"),
            "https://virtual.sepolia.rpc.tenderly.co/test.....here"
        );
        assert_eq!(obscure_url("https://sepolia.etherscan.io"), "https://sepolia.etherscan.io");
    }

    #[test]
    fn test_mask_secret() {
        let masked = mask_secret("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80");
        assert_eq!(masked, ".....ff80");
        assert!(!masked.contains("0xac"));
        assert_eq!(mask_secret("short"), ".....");
    }
}
