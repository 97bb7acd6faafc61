//! Find and replace
//!
//! Matches are found on the flattened paragraph text and then applied from
//! last to first, so the offsets of matches not yet processed stay valid.
//! Each replacement inserts the new text at the end of the match (where it
//! inherits the matched run's formatting) and then removes the matched range.

use crate::document::Document;
use crate::error::EditError;
use crate::formatting::{Formatting, MatchFormattingMode};
use crate::locator::{EditBias, locate_run};
use crate::node::{NodeId, NodeKind};
use crate::search::{CharIndex, SearchMatch, SearchOptions, compile_search_regex, is_whole_word};
use crate::text::flatten_text;
use regex::{Captures, Regex};

/// Options for [`Document::replace_text`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplaceOptions {
    /// Record replacements as tracked insertions and deletions.
    pub track_changes: bool,
    /// How the pattern is matched.
    pub search: SearchOptions,
    /// Expand `$` sequences in the replacement (see [`expand_replacement`]).
    pub substitutions: bool,
    /// Formatting applied on top of the inherited formatting of replacement text.
    pub new_formatting: Option<Formatting>,
    /// Only replace matches whose runs all satisfy this formatting.
    pub match_formatting: Option<Formatting>,
    /// How `match_formatting` is compared.
    pub match_mode: MatchFormattingMode,
}

/// A run spanned by a match failed the formatting filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingMismatch {
    /// The offending run.
    pub run: NodeId,
}

/// A replacement that was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacedMatch {
    /// Paragraph the match was found in.
    pub paragraph: NodeId,
    /// Matched range before the replacement.
    pub range: SearchMatch,
    /// The matched text.
    pub matched: String,
    /// The text inserted in its place.
    pub replacement: String,
}

/// A match left alone by the formatting filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMatch {
    /// Paragraph the match was found in.
    pub paragraph: NodeId,
    /// Matched range.
    pub range: SearchMatch,
    /// Why it was skipped.
    pub reason: FormattingMismatch,
}

/// Outcome of a replace call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplaceReport {
    /// Applied replacements, in processing (descending offset) order.
    pub replaced: Vec<ReplacedMatch>,
    /// Matches skipped by the formatting filter.
    pub skipped: Vec<SkippedMatch>,
}

impl ReplaceReport {
    /// Number of replacements applied.
    pub fn count(&self) -> usize {
        self.replaced.len()
    }

    fn absorb(&mut self, other: ReplaceReport) {
        self.replaced.extend(other.replaced);
        self.skipped.extend(other.skipped);
    }
}

/// Expand `$` sequences in `template` for one match.
///
/// | Sequence | Expands to |
/// |---|---|
/// | `$$` | a literal `$` |
/// | `$&`, `$0` | the whole match |
/// | `$n`, `$nn` | group *n*; extra digits are literal if no such group exists |
/// | `${name}` | the named (or numbered) group |
/// | `$+` | the highest-numbered group, empty when it did not participate |
/// | `` $` `` | the input before the match |
/// | `$'` | the input after the match |
/// | `$_` | the whole input |
///
/// A group that did not participate expands to nothing. Any other sequence,
/// including a reference to a group that does not exist, is copied verbatim.
pub fn expand_replacement(re: &Regex, caps: &Captures<'_>, input: &str, template: &str) -> String {
    let Some(whole) = caps.get(0) else {
        return template.to_string();
    };
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let tail = &rest[dollar + 1..];
        let Some(next) = tail.chars().next() else {
            out.push('$');
            rest = tail;
            break;
        };

        let consumed = match next {
            '$' => {
                out.push('$');
                1
            }
            '&' => {
                out.push_str(whole.as_str());
                1
            }
            '`' => {
                out.push_str(&input[..whole.start()]);
                1
            }
            '\'' => {
                out.push_str(&input[whole.end()..]);
                1
            }
            '_' => {
                out.push_str(input);
                1
            }
            '+' => {
                out.push_str(group(caps.len() - 1));
                1
            }
            '{' => match tail[1..].find('}') {
                Some(close) => {
                    let name = &tail[1..1 + close];
                    let known = match name.parse::<usize>() {
                        Ok(i) => (i < caps.len()).then(|| group(i)),
                        Err(_) => re
                            .capture_names()
                            .flatten()
                            .any(|n| n == name)
                            .then(|| caps.name(name).map_or("", |m| m.as_str())),
                    };
                    match known {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('$');
                            out.push_str(&tail[..close + 2]);
                        }
                    }
                    close + 2
                }
                None => {
                    out.push('$');
                    0
                }
            },
            '0'..='9' => {
                let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
                // Take the longest digit prefix naming an existing group.
                let found = (1..=digits).rev().find_map(|width| {
                    let i: usize = tail[..width].parse().ok()?;
                    (i < caps.len()).then_some((i, width))
                });
                match found {
                    Some((i, width)) => {
                        out.push_str(group(i));
                        width
                    }
                    None => {
                        out.push('$');
                        0
                    }
                }
            }
            _ => {
                out.push('$');
                0
            }
        };
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

impl Document {
    /// Replace every match of `pattern` in `paragraph`.
    ///
    /// Matches are processed from the last to the first. An empty pattern
    /// replaces nothing.
    pub fn replace_text(
        &mut self,
        paragraph: NodeId,
        pattern: &str,
        replacement: &str,
        options: &ReplaceOptions,
    ) -> Result<ReplaceReport, EditError> {
        let paragraph = self.paragraph(paragraph)?;
        let mut report = ReplaceReport::default();
        if pattern.is_empty() {
            return Ok(report);
        }

        let re = compile_search_regex(pattern, options.search)?;
        let text = flatten_text(&self.arena, paragraph);
        let index = CharIndex::new(&text);

        let mut found = Vec::new();
        for caps in re.captures_iter(&text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let range = index.range(whole.start(), whole.end());
            if range.is_empty() {
                continue;
            }
            if options.search.whole_word && !is_whole_word(&text, &index, range) {
                continue;
            }
            let expanded = if options.substitutions {
                expand_replacement(&re, &caps, &text, replacement)
            } else {
                replacement.to_string()
            };
            found.push((range, whole.as_str().to_string(), expanded));
        }

        for (range, matched, expanded) in found.into_iter().rev() {
            if let Some(reference) = &options.match_formatting {
                if let Err(reason) = self.check_match_formatting(
                    paragraph,
                    range,
                    reference,
                    options.match_mode,
                ) {
                    tracing::debug!(
                        %paragraph,
                        start = range.start,
                        end = range.end,
                        run = %reason.run,
                        "skipping match with mismatched formatting"
                    );
                    report.skipped.push(SkippedMatch {
                        paragraph,
                        range,
                        reason,
                    });
                    continue;
                }
            }

            self.insert_text(
                paragraph,
                range.end,
                &expanded,
                options.track_changes,
                options.new_formatting.as_ref(),
            )?;
            self.remove_text(
                paragraph,
                range.start,
                range.len(),
                options.track_changes,
                false,
            )?;
            report.replaced.push(ReplacedMatch {
                paragraph,
                range,
                matched,
                replacement: expanded,
            });
        }

        tracing::debug!(
            %paragraph,
            replaced = report.replaced.len(),
            skipped = report.skipped.len(),
            "replace finished"
        );
        Ok(report)
    }

    /// [`Document::replace_text`] over every paragraph, in document order.
    pub fn replace_text_in_document(
        &mut self,
        pattern: &str,
        replacement: &str,
        options: &ReplaceOptions,
    ) -> Result<ReplaceReport, EditError> {
        compile_search_regex(pattern, options.search)?;
        let mut report = ReplaceReport::default();
        for paragraph in self.paragraphs() {
            if !self.contains(paragraph) {
                continue;
            }
            report.absorb(self.replace_text(paragraph, pattern, replacement, options)?);
        }
        Ok(report)
    }

    /// Check every run spanned by `range` against `reference`.
    ///
    /// A run without properties is compared as an empty property bag.
    fn check_match_formatting(
        &self,
        paragraph: NodeId,
        range: SearchMatch,
        reference: &Formatting,
        mode: MatchFormattingMode,
    ) -> Result<(), FormattingMismatch> {
        let empty = Formatting::default();
        let mut cursor = range.start;
        while cursor < range.end {
            let Ok(Some(hit)) = locate_run(&self.arena, paragraph, cursor, EditBias::Delete) else {
                break;
            };
            let formatting = match self.arena.kind(hit.run) {
                NodeKind::Run {
                    formatting: Some(formatting),
                } => formatting,
                _ => &empty,
            };
            if !formatting.satisfies(reference, mode) {
                return Err(FormattingMismatch { run: hit.run });
            }
            cursor = hit.end;
        }
        Ok(())
    }
}
