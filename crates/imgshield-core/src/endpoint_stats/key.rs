use anyhow::{Context, Result};

/// Endpoint identity for latency statistics, derived from a backend URL.
///
/// Different paths on the same origin share one history: the key is the host,
/// with the port appended only when it differs from the scheme default.
pub fn endpoint_key(url: &str) -> Result<String> {
    let parsed =
        url::Url::parse(url).with_context(|| format!("invalid backend URL: {url}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("backend URL missing host: {url}"))?;
    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
