//! Endpoint URL checks.

use reqwest::Url;

/// Check that `url` is an absolute `http` or `https` URL with a host.
///
/// Returns the trimmed URL as given, so the endpoint reported back to the
/// user matches what they typed.
///
/// # Examples
///
/// ```
/// use toolrelay::utils::url::validate_endpoint_url;
///
/// assert!(validate_endpoint_url("https://mcp.example.com/mcp").is_ok());
/// assert!(validate_endpoint_url("mcp.example.com").is_err());
/// ```
pub fn validate_endpoint_url(url: &str) -> Result<String, String> {
    let trimmed = url.trim();
    let parsed = Url::parse(trimmed).map_err(|err| format!("Invalid URL '{trimmed}': {err}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!(
            "Invalid URL '{trimmed}': scheme must be http or https, not {}",
            parsed.scheme()
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(format!("Invalid URL '{trimmed}': missing host"));
    }
    Ok(trimmed.to_string())
}
