//! Event message templates.
//!
//! A template is prose with `%` substitution codes:
//!
//! - `%n`: the name of participant `n` (`0`..=`9`).
//! - `%Xn`: a grammatical form for participant `n`, where `X` is one of
//!   `N`/`A`/`G`/`R` (pronouns, falling back to the name) or one of the
//!   number-agreement codes `e s y i h ! w`.
//!
//! Any other `%` sequence is emitted verbatim. Rendering produces
//! [`Fragment`]s so callers can style tribute names apart from the prose.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::constants::{GRAMMAR_CODES, POSSESSIVE_MARKER, TEMPLATE_ESCAPE};
use crate::tribute::Tribute;

/// Raised when a template references a participant that is not bound.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "cannot substitute player '{index}' in event '{template}' since it only involves {involved} player(s); the first player's code is '%0', not '%1'"
)]
pub struct TemplateError {
    pub index: usize,
    pub involved: usize,
    pub template: String,
}

/// A piece of a rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Fragment {
    Text(String),
    /// The display name of the participant in this slot.
    Tribute(usize),
}

/// Rendered message, kept both as fragments and as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub fragments: Vec<Fragment>,
    pub text: String,
}

fn involved_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"%[NAGResyih!w]?(\d)").expect("valid template pattern"))
}

/// Number of participants a template needs: one more than the highest
/// player digit referenced. Templates without codes involve nobody.
#[must_use]
pub fn players_involved(template: &str) -> usize {
    involved_pattern()
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .filter_map(|digit| digit.as_str().parse::<usize>().ok())
        .max()
        .map_or(0, |max| max + 1)
}

struct FragmentWriter {
    fragments: Vec<Fragment>,
}

impl FragmentWriter {
    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Fragment::Text(last)) = self.fragments.last_mut() {
            last.push_str(text);
        } else {
            self.fragments.push(Fragment::Text(text.to_string()));
        }
    }

    fn char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.text(c.encode_utf8(&mut buf));
    }

    fn tribute(&mut self, slot: usize) {
        self.fragments.push(Fragment::Tribute(slot));
    }
}

fn check_bounds(template: &str, index: usize, involved: usize) -> Result<(), TemplateError> {
    if index >= involved {
        return Err(TemplateError {
            index,
            involved,
            template: template.to_string(),
        });
    }
    Ok(())
}

fn write_grammar(out: &mut FragmentWriter, code: char, slot: usize, tribute: &Tribute) {
    let pronouns = tribute.pronouns.as_ref();
    let plural = tribute.plural;
    match code {
        'N' | 'A' | 'R' | 'G' => match pronouns {
            Some(set) => out.text(match code {
                'N' => &set.nominative,
                'A' => &set.accusative,
                'G' => &set.genitive,
                _ => &set.reflexive,
            }),
            None => {
                out.tribute(slot);
                if code == 'G' {
                    out.text(POSSESSIVE_MARKER);
                }
            }
        },
        'e' => out.text(if plural { "" } else { "es" }),
        's' => out.text(if plural { "" } else { "s" }),
        'y' => out.text(if plural { "y" } else { "ies" }),
        'i' => out.text(if plural { "are" } else { "is" }),
        'h' => out.text(if plural { "have" } else { "has" }),
        '!' => out.text(if plural { "aren't" } else { "isn't" }),
        'w' => out.text(if plural { "were" } else { "was" }),
        _ => {}
    }
}

/// Render a template against the participants bound to an event.
///
/// # Errors
///
/// Returns a [`TemplateError`] when a code references a slot at or beyond
/// `participants.len()`; this indicates a malformed event definition.
pub fn render_fragments(
    template: &str,
    participants: &[&Tribute],
) -> Result<Vec<Fragment>, TemplateError> {
    let involved = participants.len();
    let mut out = FragmentWriter {
        fragments: Vec::new(),
    };
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != TEMPLATE_ESCAPE {
            out.char(c);
            continue;
        }
        let Some(&code) = chars.peek() else {
            out.char(c);
            break;
        };
        if let Some(index) = code.to_digit(10) {
            chars.next();
            let index = index as usize;
            check_bounds(template, index, involved)?;
            out.tribute(index);
            continue;
        }
        if GRAMMAR_CODES.contains(&code) {
            let mut lookahead = chars.clone();
            lookahead.next();
            if let Some(index) = lookahead.peek().and_then(|d| d.to_digit(10)) {
                let index = index as usize;
                check_bounds(template, index, involved)?;
                chars.next();
                chars.next();
                write_grammar(&mut out, code, index, participants[index]);
                continue;
            }
        }
        // Not a substitution code; keep the escape and rescan from `code`.
        out.char(c);
    }

    Ok(out.fragments)
}

/// Join fragments into plain text using raw tribute names.
#[must_use]
pub fn fragments_to_text(fragments: &[Fragment], participants: &[&Tribute]) -> String {
    let mut text = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Text(chunk) => text.push_str(chunk),
            Fragment::Tribute(slot) => {
                if let Some(tribute) = participants.get(*slot) {
                    text.push_str(&tribute.name);
                }
            }
        }
    }
    text
}

/// Render a template to both fragments and plain text.
///
/// # Errors
///
/// See [`render_fragments`].
pub fn render(template: &str, participants: &[&Tribute]) -> Result<RenderedMessage, TemplateError> {
    let fragments = render_fragments(template, participants)?;
    let text = fragments_to_text(&fragments, participants);
    Ok(RenderedMessage { fragments, text })
}
