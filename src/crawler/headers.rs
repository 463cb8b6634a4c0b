use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT,
};

/// Build the fixed browser-like header set sent with every request
///
/// The target site blocks obvious bot traffic, so requests impersonate a
/// desktop Chrome session. The set is fixed for the process lifetime and is
/// not negotiated per request.
///
/// # Examples
///
/// ```
/// use marketminer::crawler::headers::browser_headers;
///
/// let headers = browser_headers();
/// assert!(headers.contains_key("user-agent"));
/// ```
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

    // Client-hint headers matching the advertised Chrome build
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        HeaderValue::from_static(
            "\"Chromium\";v=\"128\", \"Not;A=Brand\";v=\"24\", \"Google Chrome\";v=\"128\"",
        ),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-mobile"),
        HeaderValue::from_static("?0"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        HeaderValue::from_static("\"Windows\""),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-device-memory"),
        HeaderValue::from_static("8"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-dpr"),
        HeaderValue::from_static("1.25"),
    );

    // Sec-Fetch headers for a top-level navigation
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-user"),
        HeaderValue::from_static("?1"),
    );
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );
    headers.insert(
        HeaderName::from_static("viewport-width"),
        HeaderValue::from_static("1042"),
    );

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_headers_complete() {
        let headers = browser_headers();

        assert!(headers.contains_key(USER_AGENT));
        assert!(headers.contains_key(ACCEPT));
        assert!(headers.contains_key(ACCEPT_LANGUAGE));
        assert!(headers.contains_key(CACHE_CONTROL));

        assert!(headers.contains_key("sec-ch-ua"));
        assert!(headers.contains_key("sec-fetch-dest"));
        assert!(headers.contains_key("sec-fetch-mode"));
        assert!(headers.contains_key("sec-fetch-site"));
        assert!(headers.contains_key("sec-fetch-user"));
        assert!(headers.contains_key("upgrade-insecure-requests"));
    }

    #[test]
    fn test_user_agent_is_desktop_chrome() {
        let headers = browser_headers();
        let ua = headers.get(USER_AGENT).unwrap().to_str().unwrap();
        assert!(ua.contains("Chrome/128"));
        assert!(ua.contains("Windows NT 10.0"));
    }

    #[test]
    fn test_headers_are_stable() {
        // The set is fixed, not rotated
        assert_eq!(browser_headers(), browser_headers());
    }
}
