use axum::http::HeaderMap;

// Where the gateway sits behind a proxy, the client address arrives in
// forwarding headers. Checked in order of trust; the loopback fallback
// keeps direct/local traffic under one shared identifier.
const FALLBACK: &str = "127.0.0.1";

pub fn resolve_client_id(headers: &HeaderMap) -> String {
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        // first entry is the original client, the rest are proxies
        if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
            return first.to_owned();
        }
    }
    if let Some(real_ip) = header_str(headers, "x-real-ip") {
        return real_ip.trim().to_owned();
    }
    if let Some(cf_ip) = header_str(headers, "cf-connecting-ip") {
        return cf_ip.trim().to_owned();
    }
    FALLBACK.to_owned()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
}
