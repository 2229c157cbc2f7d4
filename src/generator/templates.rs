//! Embedded markup fragments and `%key%` substitution.

pub const CONTAINER: &str = include_str!("../../templates/container.xml");
pub const DISPLAY_OPTIONS: &str = include_str!("../../templates/display-options.xml");
pub const CONTENT: &str = include_str!("../../templates/content.opf");
pub const NAV: &str = include_str!("../../templates/nav.xhtml");
pub const STYLE: &str = include_str!("../../templates/style.css");
pub const PAGE: &str = include_str!("../../templates/page.xhtml");
pub const BLANK: &str = include_str!("../../templates/blank.xhtml");

// Package and navigation fragments, one per repeated element.
pub const CREATOR: &str = include_str!("../../templates/creator.xml");
pub const DESCRIPTION: &str = include_str!("../../templates/description.xml");
pub const COLLECTION: &str = include_str!("../../templates/collection.xml");
pub const ITEM: &str = include_str!("../../templates/item.xml");
pub const COVER_ITEM: &str = include_str!("../../templates/cover-item.xml");
pub const ITEMREF: &str = include_str!("../../templates/itemref.xml");
pub const NAV_LIST: &str = include_str!("../../templates/nav-list.xhtml");
pub const NAV_ENTRY: &str = include_str!("../../templates/nav-entry.xhtml");

/// Replaces every `%key%` of `template` with its value.
///
/// The template is read once from left to right and values are copied verbatim,
/// so a value containing `%other%` is never expanded again. Escape text with
/// [`escape_xml`] first. Tokens without a value are left in place.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let found = after.find('%').and_then(|end| {
            let key = &after[..end];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (end, *value))
        });
        match found {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                // a lone percent sign; the next one may open a token
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escapes the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
