//! Shareable locator strings: a flat, fragment-style `name=value` list.

/// Parse `#?a=1&b=two` style input into decoded pairs, in order.
///
/// A value that fails to percent-decode is kept raw.
pub fn parse_locator(input: &str) -> Vec<(String, String)> {
    let trimmed = input.strip_prefix('#').unwrap_or(input);
    let trimmed = trimmed.strip_prefix('?').unwrap_or(trimmed);

    trimmed
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(name), decode_component(value))
        })
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// Join pairs into `a=1&b=two`, percent-encoding every value.
pub fn format_locator<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
