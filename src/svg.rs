//! SVG content gate for generated diagrams.
//!
//! Every check here is a regex heuristic over the raw text, not an XML parse.
//! Structural and security violations become `errors`; cosmetic concerns become
//! `warnings`. Malformed input never panics or returns `Err`: callers always get an
//! [`SvgValidationResult`] and must refuse to render when it is not valid.

use std::sync::LazyLock;

use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use regex::{Captures, Regex};

use crate::{error::SvgDecodeError, models::SvgValidationResult};

/// Trimmed content shorter than this cannot hold a meaningful diagram.
pub const MIN_SVG_LENGTH: usize = 100;

/// Tolerated difference between opened and closed tags before warning.
const TAG_BALANCE_TOLERANCE: usize = 5;

pub const SVG_DATA_URL_PREFIX: &str = "data:image/svg+xml";

pub const ERR_TOO_SHORT: &str = "SVG content is empty or too short";
pub const ERR_MISSING_OPEN: &str = "SVG must start with an <svg> tag";
pub const ERR_MISSING_CLOSE: &str = "SVG must end with a </svg> tag";
pub const ERR_NO_DIMENSIONS: &str = "SVG must declare a viewBox or both width and height";
pub const ERR_NO_SHAPES: &str =
    "SVG contains no shape elements (polygon, circle, ellipse, path, line, rect, polyline)";
pub const ERR_SCRIPT: &str = "SVG contains a <script> tag";
pub const ERR_JAVASCRIPT_URL: &str = "SVG contains a javascript: URL";
pub const ERR_NOT_SVG_DATA_URL: &str = "Data URL must start with data:image/svg+xml";

pub const WARN_ZERO_VIEWBOX: &str = "viewBox has zero width or height";
pub const WARN_NO_TEXT: &str = "SVG has no <text> elements; labels may be missing";

// Generated data URLs often drop trailing padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

struct SvgPatterns {
    view_box: Regex,
    width: Regex,
    height: Regex,
    shape: Regex,
    text: Regex,
    script: Regex,
    javascript_url: Regex,
    open_tag: Regex,
    close_tag: Regex,
    self_closing: Regex,

    // sanitize
    script_block: Regex,
    markup_tag: Regex,
    event_handler: Regex,
}

impl SvgPatterns {
    fn new() -> Self {
        Self {
            view_box: Regex::new(r#"viewBox\s*=\s*["']([^"']*)["']"#).expect("valid viewBox regex"),
            width: Regex::new(r#"(?:^|\s)width\s*=\s*["']?\s*\d"#).expect("valid width regex"),
            height: Regex::new(r#"(?:^|\s)height\s*=\s*["']?\s*\d"#).expect("valid height regex"),
            shape: Regex::new(r"<(?:polygon|circle|ellipse|path|line|rect|polyline)\b")
                .expect("valid shape regex"),
            text: Regex::new(r"<text\b").expect("valid text regex"),
            script: Regex::new(r"(?i)<script").expect("valid script regex"),
            javascript_url: Regex::new(r"(?i)javascript:").expect("valid javascript regex"),
            open_tag: Regex::new(r"<[A-Za-z][\w:.-]*").expect("valid open tag regex"),
            close_tag: Regex::new(r"</[A-Za-z][\w:.-]*\s*>").expect("valid close tag regex"),
            self_closing: Regex::new(r"/>").expect("valid self-closing regex"),

            script_block: Regex::new(r"(?is)<script\b[^>]*?(?:/>|>.*?</script\s*>)")
                .expect("valid script block regex"),
            markup_tag: Regex::new(r"<[A-Za-z][^>]*>").expect("valid markup tag regex"),
            event_handler: Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
                .expect("valid event handler regex"),
        }
    }
}

static PATTERNS: LazyLock<SvgPatterns> = LazyLock::new(SvgPatterns::new);

/// validate
///
/// Checks raw SVG text. The length floor short-circuits; every other check runs and
/// all findings are collected.
pub fn validate(svg: &str) -> SvgValidationResult {
    let trimmed = svg.trim();
    if trimmed.chars().count() < MIN_SVG_LENGTH {
        return SvgValidationResult::rejected(ERR_TOO_SHORT);
    }

    let p = &*PATTERNS;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !trimmed.starts_with("<svg") {
        errors.push(ERR_MISSING_OPEN.to_string());
    }
    if !trimmed.ends_with("</svg>") {
        errors.push(ERR_MISSING_CLOSE.to_string());
    }

    let view_box = p.view_box.captures(trimmed).and_then(|c| c.get(1));
    let has_size = p.width.is_match(trimmed) && p.height.is_match(trimmed);
    if view_box.is_none() && !has_size {
        errors.push(ERR_NO_DIMENSIONS.to_string());
    }

    if !p.shape.is_match(trimmed) {
        errors.push(ERR_NO_SHAPES.to_string());
    }
    if p.script.is_match(trimmed) {
        errors.push(ERR_SCRIPT.to_string());
    }
    if p.javascript_url.is_match(trimmed) {
        errors.push(ERR_JAVASCRIPT_URL.to_string());
    }

    if let Some(view_box) = view_box {
        if has_zero_extent(view_box.as_str()) {
            warnings.push(WARN_ZERO_VIEWBOX.to_string());
        }
    }
    if !p.text.is_match(trimmed) {
        warnings.push(WARN_NO_TEXT.to_string());
    }

    let opened = p.open_tag.find_iter(trimmed).count();
    let closed = p.close_tag.find_iter(trimmed).count() + p.self_closing.find_iter(trimmed).count();
    if opened.abs_diff(closed) > TAG_BALANCE_TOLERANCE {
        warnings.push(format!(
            "SVG tags look unbalanced ({opened} opened, {closed} closed)"
        ));
    }

    SvgValidationResult::new(errors, warnings)
}

/// The third and fourth viewBox components are width and height.
fn has_zero_extent(view_box: &str) -> bool {
    view_box
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .skip(2)
        .take(2)
        .any(|part| part.parse::<f64>().is_ok_and(|value| value == 0.0))
}

/// validate_data_url
///
/// Decodes an SVG data URL and validates the payload. A wrong prefix or an
/// undecodable payload yields a single error and no warnings.
pub fn validate_data_url(data_url: &str) -> SvgValidationResult {
    if !data_url.starts_with(SVG_DATA_URL_PREFIX) {
        return SvgValidationResult::rejected(ERR_NOT_SVG_DATA_URL);
    }
    match decode_data_url(data_url) {
        Ok(svg) => validate(&svg),
        Err(e) => SvgValidationResult::rejected(format!("Failed to decode SVG data URL: {e}")),
    }
}

/// decode_data_url
///
/// `base64,` anywhere in the URL selects base64 for everything after it; otherwise
/// the text after the first comma is percent-decoded.
pub fn decode_data_url(data_url: &str) -> Result<String, SvgDecodeError> {
    let bytes = match data_url.split_once("base64,") {
        Some((_, payload)) => {
            let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            LENIENT_BASE64
                .decode(compact)
                .map_err(|e| SvgDecodeError::Base64(e.to_string()))?
        }
        None => {
            let (_, payload) = data_url.split_once(',').ok_or(SvgDecodeError::MissingPayload)?;
            percent_decode(payload)?
        }
    };
    String::from_utf8(bytes).map_err(|_| SvgDecodeError::Utf8)
}

// Every `%` must be followed by two hex digits; `+` is kept literally.
fn percent_decode(input: &str) -> Result<Vec<u8>, SvgDecodeError> {
    let raw = input.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hi = raw.get(i + 1).and_then(|b| hex_value(*b));
            let lo = raw.get(i + 2).and_then(|b| hex_value(*b));
            match (hi, lo) {
                (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
                _ => return Err(SvgDecodeError::Percent(i)),
            }
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// sanitize
///
/// Best-effort cleanup: drops `<script>` blocks, `on*` event handler attributes and
/// `javascript:` fragments. Handlers are only matched inside start tags, so label
/// text such as "one = 1" is left alone. This is NOT a complete sanitizer and must not be treated
/// as a security boundary; run `validate` on the output before rendering it.
pub fn sanitize(svg: &str) -> String {
    let p = &*PATTERNS;
    let without_scripts = p.script_block.replace_all(svg, "");
    let without_handlers = p.markup_tag.replace_all(&without_scripts, |tag: &Captures<'_>| {
        p.event_handler.replace_all(&tag[0], "").into_owned()
    });
    let cleaned = p.javascript_url.replace_all(&without_handlers, "").into_owned();

    if cleaned.len() != svg.len() {
        tracing::debug!(
            removed_bytes = svg.len() - cleaned.len(),
            "sanitize stripped active content from svg"
        );
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagram() -> String {
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 120">"#,
            r##"<rect x="10" y="10" width="80" height="40" fill="#fde68a"/>"##,
            r##"<circle cx="150" cy="60" r="30" stroke="#1d4ed8" stroke-width="2"/>"##,
            r#"<text x="20" y="100">Area = 3200</text>"#,
            "</svg>"
        )
        .to_string()
    }

    #[test]
    fn well_formed_diagram_is_clean() {
        let result = validate(&diagram());
        assert!(result.is_valid(), "{:?}", result.errors());
        assert!(result.warnings().is_empty(), "{:?}", result.warnings());
    }

    #[test]
    fn short_input_only_reports_length() {
        for input in ["", "   ", "<svg></svg>", "<svg><script>alert(1)</script></svg>"] {
            let result = validate(input);
            assert!(!result.is_valid());
            assert_eq!(result.errors(), [ERR_TOO_SHORT]);
            assert!(result.warnings().is_empty());
        }
    }

    #[test]
    fn width_and_height_substitute_for_view_box() {
        let svg = diagram().replace(r#"viewBox="0 0 200 120""#, r#"width="200" height="120""#);
        assert!(validate(&svg).is_valid());
    }

    #[test]
    fn stroke_width_does_not_count_as_width() {
        let svg = format!(
            r#"<svg height="120"><circle cx="50" cy="60" r="30" stroke-width="2"/><text x="5" y="110">{}</text></svg>"#,
            "radius ".repeat(6)
        );
        let result = validate(&svg);
        assert_eq!(result.errors(), [ERR_NO_DIMENSIONS]);
    }

    #[test]
    fn linear_gradient_is_not_a_line() {
        let svg = format!(
            r#"<svg viewBox="0 0 10 10"><defs><linearGradient id="g"></linearGradient></defs><text>{}</text></svg>"#,
            "label ".repeat(10)
        );
        let result = validate(&svg);
        assert_eq!(result.errors(), [ERR_NO_SHAPES]);
    }

    #[test]
    fn security_checks_are_case_insensitive() {
        let svg = diagram().replace("<text", r#"<a href="JavaScript:go()"></a><SCRIPT>x()</SCRIPT><text"#);
        let result = validate(&svg);
        assert!(result.errors().contains(&ERR_SCRIPT.to_string()));
        assert!(result.errors().contains(&ERR_JAVASCRIPT_URL.to_string()));
    }

    #[test]
    fn zero_extent_is_detected_in_either_slot() {
        assert!(has_zero_extent("0 0 0 100"));
        assert!(has_zero_extent("0,0,100,0"));
        assert!(has_zero_extent("0 0 0.0 5"));
        assert!(!has_zero_extent("0 0 100 100"));
        assert!(!has_zero_extent("0 0"));
    }

    #[test]
    fn unbalanced_tags_warn_without_failing() {
        let unclosed_groups = format!("{}<text", r#"<g fill="red">"#.repeat(8));
        let svg = diagram().replace("<text", &unclosed_groups);
        let result = validate(&svg);
        assert!(result.is_valid());
        assert!(result.warnings().iter().any(|w| w.contains("unbalanced")));
    }

    #[test]
    fn percent_decoding_is_strict() {
        assert_eq!(percent_decode("%3Csvg%3e").unwrap(), b"<svg>");
        assert_eq!(percent_decode("a+b").unwrap(), b"a+b");
        assert_eq!(percent_decode("%zz"), Err(SvgDecodeError::Percent(0)));
        assert_eq!(percent_decode("ab%4"), Err(SvgDecodeError::Percent(2)));
    }

    #[test]
    fn data_url_without_payload_is_a_decode_error() {
        assert_eq!(
            decode_data_url("data:image/svg+xml"),
            Err(SvgDecodeError::MissingPayload)
        );
    }

    #[test]
    fn sanitize_strips_active_content() {
        let dirty = r#"<svg onload="steal()"><script type="text/javascript">alert(1)</script><a href="javascript:void(0)"><rect onclick='x()' width="5"/></a></svg>"#;
        let clean = sanitize(dirty);
        assert!(!clean.to_lowercase().contains("<script"));
        assert!(!clean.contains("onload"));
        assert!(!clean.contains("onclick"));
        assert!(!clean.to_lowercase().contains("javascript:"));
        assert!(clean.contains(r#"<rect width="5"/>"#));
    }

    #[test]
    fn sanitize_keeps_label_text_that_looks_like_a_handler() {
        let svg = diagram().replace("Area = 3200", "Pick one = 1 apple and online = yes");
        assert_eq!(sanitize(&svg), svg);

        let hostile = svg.replace("<text ", r#"<text onclick="x()" "#);
        assert_eq!(sanitize(&hostile), svg);
    }

    #[test]
    fn sanitize_leaves_clean_diagrams_untouched() {
        let svg = diagram();
        assert_eq!(sanitize(&svg), svg);
    }
}
