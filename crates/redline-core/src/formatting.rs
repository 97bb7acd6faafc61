//! Run formatting
//!
//! A [`Formatting`] is the property bag behind a run's properties fragment
//! (`w:rPr`). Every field is optional: `None` means "not set here", which is
//! what makes merging work (an override only replaces the fields it sets).

use crate::error::XmlError;

/// Underline style (`w:u/@w:val`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnderlineStyle {
    /// Explicitly no underline.
    None,
    /// Single line.
    Single,
    /// Double line.
    Double,
    /// Thick line.
    Thick,
    /// Dotted line.
    Dotted,
    /// Dashed line.
    Dash,
    /// Wavy line.
    Wave,
    /// Underline words but not spaces.
    Words,
}

impl UnderlineStyle {
    /// Attribute value used in the properties fragment.
    pub fn as_str(self) -> &'static str {
        match self {
            UnderlineStyle::None => "none",
            UnderlineStyle::Single => "single",
            UnderlineStyle::Double => "double",
            UnderlineStyle::Thick => "thick",
            UnderlineStyle::Dotted => "dotted",
            UnderlineStyle::Dash => "dash",
            UnderlineStyle::Wave => "wave",
            UnderlineStyle::Words => "words",
        }
    }

    /// Parse an attribute value; unknown values map to `Single`.
    pub fn parse(value: &str) -> Self {
        match value {
            "none" => UnderlineStyle::None,
            "double" => UnderlineStyle::Double,
            "thick" => UnderlineStyle::Thick,
            "dotted" => UnderlineStyle::Dotted,
            "dash" => UnderlineStyle::Dash,
            "wave" => UnderlineStyle::Wave,
            "words" => UnderlineStyle::Words,
            _ => UnderlineStyle::Single,
        }
    }
}

/// Vertical text alignment (`w:vertAlign/@w:val`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAlign {
    /// Normal position.
    Baseline,
    /// Raised, smaller text.
    Superscript,
    /// Lowered, smaller text.
    Subscript,
}

impl VerticalAlign {
    /// Attribute value used in the properties fragment.
    pub fn as_str(self) -> &'static str {
        match self {
            VerticalAlign::Baseline => "baseline",
            VerticalAlign::Superscript => "superscript",
            VerticalAlign::Subscript => "subscript",
        }
    }

    /// Parse an attribute value; unknown values map to `Baseline`.
    pub fn parse(value: &str) -> Self {
        match value {
            "superscript" => VerticalAlign::Superscript,
            "subscript" => VerticalAlign::Subscript,
            _ => VerticalAlign::Baseline,
        }
    }
}

/// How a run's formatting is compared against a reference when filtering matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchFormattingMode {
    /// Every property set on the reference must be set to the same value on the run.
    /// The run may carry additional properties.
    #[default]
    SubsetMatch,
    /// The run must carry exactly the reference's properties.
    ExactMatch,
}

/// Run properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatting {
    /// Bold (`w:b`).
    pub bold: Option<bool>,
    /// Italic (`w:i`).
    pub italic: Option<bool>,
    /// Underline (`w:u`).
    pub underline: Option<UnderlineStyle>,
    /// Single strikethrough (`w:strike`).
    pub strike: Option<bool>,
    /// All caps (`w:caps`).
    pub caps: Option<bool>,
    /// Text color as `RRGGBB` hex (`w:color`).
    pub color: Option<String>,
    /// Font family (`w:rFonts`).
    pub font_family: Option<String>,
    /// Font size in half-points (`w:sz`).
    pub size: Option<u32>,
    /// Highlight color name (`w:highlight`).
    pub highlight: Option<String>,
    /// Superscript/subscript (`w:vertAlign`).
    pub vertical_align: Option<VerticalAlign>,
    /// Language tag (`w:lang`).
    pub language: Option<String>,
}

fn subset<T: PartialEq>(reference: &Option<T>, candidate: &Option<T>) -> bool {
    reference
        .as_ref()
        .is_none_or(|value| candidate.as_ref() == Some(value))
}

impl Formatting {
    /// An empty property bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bold.
    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = Some(bold);
        self
    }

    /// Set italic.
    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    /// Set the underline style.
    pub fn with_underline(mut self, style: UnderlineStyle) -> Self {
        self.underline = Some(style);
        self
    }

    /// Set strikethrough.
    pub fn with_strike(mut self, strike: bool) -> Self {
        self.strike = Some(strike);
        self
    }

    /// Set all caps.
    pub fn with_caps(mut self, caps: bool) -> Self {
        self.caps = Some(caps);
        self
    }

    /// Set the text color (`RRGGBB`).
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Set the font family.
    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    /// Set the font size in half-points (24 = 12pt).
    pub fn with_size(mut self, half_points: u32) -> Self {
        self.size = Some(half_points);
        self
    }

    /// Set the highlight color name.
    pub fn with_highlight(mut self, highlight: impl Into<String>) -> Self {
        self.highlight = Some(highlight.into());
        self
    }

    /// Set the vertical alignment.
    pub fn with_vertical_align(mut self, align: VerticalAlign) -> Self {
        self.vertical_align = Some(align);
        self
    }

    /// Set the language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Returns `true` if no property is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Clone `self` and override every field that `overrides` sets.
    pub fn merged_with(&self, overrides: &Formatting) -> Formatting {
        Formatting {
            bold: overrides.bold.or(self.bold),
            italic: overrides.italic.or(self.italic),
            underline: overrides.underline.or(self.underline),
            strike: overrides.strike.or(self.strike),
            caps: overrides.caps.or(self.caps),
            color: overrides.color.clone().or_else(|| self.color.clone()),
            font_family: overrides
                .font_family
                .clone()
                .or_else(|| self.font_family.clone()),
            size: overrides.size.or(self.size),
            highlight: overrides
                .highlight
                .clone()
                .or_else(|| self.highlight.clone()),
            vertical_align: overrides.vertical_align.or(self.vertical_align),
            language: overrides
                .language
                .clone()
                .or_else(|| self.language.clone()),
        }
    }

    /// Returns `true` if every property set on `reference` is set identically on `self`.
    pub fn contains(&self, reference: &Formatting) -> bool {
        subset(&reference.bold, &self.bold)
            && subset(&reference.italic, &self.italic)
            && subset(&reference.underline, &self.underline)
            && subset(&reference.strike, &self.strike)
            && subset(&reference.caps, &self.caps)
            && subset(&reference.color, &self.color)
            && subset(&reference.font_family, &self.font_family)
            && subset(&reference.size, &self.size)
            && subset(&reference.highlight, &self.highlight)
            && subset(&reference.vertical_align, &self.vertical_align)
            && subset(&reference.language, &self.language)
    }

    /// Check `self` (a run's properties) against a reference under `mode`.
    pub fn satisfies(&self, reference: &Formatting, mode: MatchFormattingMode) -> bool {
        match mode {
            MatchFormattingMode::SubsetMatch => self.contains(reference),
            MatchFormattingMode::ExactMatch => self == reference,
        }
    }

    /// Serialize into a `w:rPr` properties fragment.
    pub fn to_properties_fragment(&self) -> Result<String, XmlError> {
        crate::xml::properties_to_xml(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_override_wins_unset_inherits() {
        let base = Formatting::new()
            .with_bold(true)
            .with_color("FF0000")
            .with_size(24);
        let overrides = Formatting::new().with_color("0000FF").with_italic(true);

        let merged = base.merged_with(&overrides);
        assert_eq!(merged.bold, Some(true));
        assert_eq!(merged.italic, Some(true));
        assert_eq!(merged.color.as_deref(), Some("0000FF"));
        assert_eq!(merged.size, Some(24));
    }

    #[test]
    fn test_subset_match() {
        let run = Formatting::new().with_bold(true).with_size(28);
        let reference = Formatting::new().with_bold(true);

        assert!(run.satisfies(&reference, MatchFormattingMode::SubsetMatch));
        assert!(!run.satisfies(&reference, MatchFormattingMode::ExactMatch));
        assert!(!reference.satisfies(&run, MatchFormattingMode::SubsetMatch));
    }

    #[test]
    fn test_exact_match() {
        let run = Formatting::new().with_italic(true);
        assert!(run.satisfies(
            &Formatting::new().with_italic(true),
            MatchFormattingMode::ExactMatch
        ));
        assert!(!run.satisfies(
            &Formatting::new().with_italic(false),
            MatchFormattingMode::ExactMatch
        ));
    }

    #[test]
    fn test_empty_reference_matches_anything_in_subset_mode() {
        let run = Formatting::new().with_caps(true);
        assert!(run.satisfies(&Formatting::new(), MatchFormattingMode::SubsetMatch));
        assert!(Formatting::new().is_empty());
        assert!(!run.is_empty());
    }
}
