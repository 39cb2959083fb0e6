/// Look up a cookie in a `Cookie`-header style string
///
/// Returns the percent-decoded value of the first cookie named `name`.
/// Values that do not decode to UTF-8 are returned as-is.
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then_some(value)
        })
        .map(|value| match urlencoding::decode(value) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => value.to_string(),
        })
}
