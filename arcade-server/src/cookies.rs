use axum::http::{HeaderMap, HeaderValue};

pub const REFRESH_COOKIE_NAME: &str = "rsid";
const REFRESH_COOKIE_MAX_AGE_SECS: i64 = 14 * 24 * 3600;

pub fn set_refresh_cookie(headers: &mut HeaderMap, token: &str) {
    let value = format!(
        "{REFRESH_COOKIE_NAME}={token}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={REFRESH_COOKIE_MAX_AGE_SECS}"
    );
    if let Ok(header_value) = HeaderValue::from_str(&value) {
        headers.append(axum::http::header::SET_COOKIE, header_value);
    }
}

pub fn read_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == REFRESH_COOKIE_NAME).then(|| value.to_string())
    })
}
