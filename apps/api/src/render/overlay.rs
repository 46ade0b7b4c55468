//! SVG text overlay for a personalized card.
//!
//! The overlay is exactly the size of the template and holds a single
//! `<text>` element centered on the card's signature point. With a greeting,
//! the greeting sits above the name as a smaller line; the offsets below are
//! in em and must stay as they are to keep generated cards visually stable.

use crate::models::card::Card;

/// Vertical offset of the greeting line from the signature baseline.
pub const GREETING_DY_EM: f32 = -0.6;
/// Vertical offset of the name line from the greeting line.
pub const NAME_DY_EM: f32 = 1.6;
/// Greeting font size relative to the card's signature size.
pub const GREETING_SCALE: f32 = 0.8;

/// Builds the overlay document for `card` at `width` x `height` pixels.
/// An empty greeting is treated as no greeting.
pub fn build_overlay_svg(
    card: &Card,
    width: u32,
    height: u32,
    user_name: &str,
    greeting: Option<&str>,
) -> String {
    let x = card.signature_x;
    let content = match greeting.filter(|g| !g.is_empty()) {
        Some(greeting) => format!(
            r#"<tspan x="{x}" dy="{GREETING_DY_EM}em" font-size="{GREETING_SCALE}em">{greeting}</tspan><tspan x="{x}" dy="{NAME_DY_EM}em" font-size="1em" font-weight="bold">{name}</tspan>"#,
            greeting = escape_xml(greeting),
            name = escape_xml(user_name),
        ),
        None => escape_xml(user_name),
    };

    format!(
        r#"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg"><text x="{x}" y="{y}" text-anchor="middle" fill="{fill}" font-size="{size}px" font-family="{family}" font-weight="bold">{content}</text></svg>"#,
        y = card.signature_y,
        fill = escape_xml(&card.signature_color),
        size = card.signature_size,
        family = font_family_list(&card.signature_font),
    )
}

/// Quotes the configured family and falls back to the generic sans-serif.
fn font_family_list(font: &str) -> String {
    let name: String = font
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '<' | '>' | '&'))
        .collect();
    if name.trim().is_empty() {
        "sans-serif".to_string()
    } else {
        format!("'{}', sans-serif", name.trim())
    }
}

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
