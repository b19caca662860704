// src/reference/customization.rs
// =============================================================================
// This module reads display options from the reference URL's query string.
//
// Supported query parameters:
//   ?title=Foo               - code block title (instead of the file path)
//   ?referenceLinkText=Bar   - text of the link back to GitHub
//   ?customStyling           - no inline style on the link; the page styles the
//                              "github-codeblock-reference-link" class itself
//
// Rust concepts:
// - BTreeMap: ordered key/value map, so CSS comes out in a stable order
// - Option<String>: the title may or may not be given
// =============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use url::Url;

/// Link text used when `referenceLinkText` is not given
pub const DEFAULT_LINK_TEXT: &str = "See full example on GitHub";

/// CSS class put on the link container when custom styling is requested
pub const CUSTOM_STYLING_CLASS: &str = "github-codeblock-reference-link";

// Built-in look of the reference link, in declaration order
const DEFAULT_NOTE_STYLE: &[(&str, &str)] = &[
    ("font-size", ".9em"),
    ("font-weight", "600"),
    ("color", "#0E75DD"),
    ("text-align", "center"),
    ("padding-bottom", "13px"),
    ("text-decoration", "underline"),
];

// A set of inline CSS declarations
//
// #[serde(transparent)] serializes it as a plain JSON object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NoteStyle {
    declarations: BTreeMap<String, String>,
}

impl NoteStyle {
    /// The built-in centered, bold, underlined link style
    pub fn builtin() -> Self {
        NoteStyle {
            declarations: DEFAULT_NOTE_STYLE
                .iter()
                .map(|(property, value)| (property.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations.get(property).map(String::as_str)
    }

    // Renders the declarations for a `style="..."` attribute
    //
    // Built-in properties keep their declaration order; anything else follows
    // alphabetically.
    pub fn to_css(&self) -> String {
        let mut ordered: Vec<(&str, &str)> = DEFAULT_NOTE_STYLE
            .iter()
            .filter_map(|(property, _)| self.get(property).map(|value| (*property, value)))
            .collect();

        for (property, value) in &self.declarations {
            if !DEFAULT_NOTE_STYLE.iter().any(|(known, _)| known == property) {
                ordered.push((property.as_str(), value.as_str()));
            }
        }

        ordered
            .iter()
            .map(|(property, value)| format!("{}: {}", property, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// Display preferences parsed from the query string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomizationOptions {
    /// Title override; None falls back to the file path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Text of the link back to the source
    pub link_text: String,
    /// Inline style for the link; empty when custom styling is requested
    pub note_styling: NoteStyle,
    /// True when `customStyling` is present (its value is ignored)
    pub use_custom_styling: bool,
}

impl CustomizationOptions {
    /// CSS class for the link container ("" unless custom styling is on)
    pub fn class_name(&self) -> &'static str {
        if self.use_custom_styling {
            CUSTOM_STYLING_CLASS
        } else {
            ""
        }
    }
}

// Parses display options from a reference string
//
// Unlike parse_reference, the whole (trimmed) input must be a valid URL.
//
// Example:
//   "https://github.com/o/r/blob/main/a.rs?title=Foo&customStyling"
//   -> title = Some("Foo"), use_custom_styling = true, note_styling = {}
pub fn parse_customization(reference: &str) -> Result<CustomizationOptions> {
    let url = Url::parse(reference.trim())
        .with_context(|| format!("Reference is not a URL: {:?}", reference.trim()))?;

    let mut title = None;
    let mut link_text = None;
    let mut use_custom_styling = false;

    // The first occurrence of a parameter wins
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "title" if title.is_none() => title = Some(value.into_owned()),
            "referenceLinkText" if link_text.is_none() => link_text = Some(value.into_owned()),
            "customStyling" => use_custom_styling = true,
            _ => {}
        }
    }

    let note_styling = if use_custom_styling {
        NoteStyle::default()
    } else {
        NoteStyle::builtin()
    };

    Ok(CustomizationOptions {
        title,
        link_text: link_text.unwrap_or_else(|| DEFAULT_LINK_TEXT.to_string()),
        note_styling,
        use_custom_styling,
    })
}
