//! Turns a reconstructed, fully tagged article body into presentation
//! markup. Grounded on `stardict.cpp`'s `parseData`/`xdxf2html`: a field
//! walk, an abbreviation-expansion pass, a list-reformatting pass and a
//! whitespace-normalization pass, each run over the previous pass's output.

use regex::Regex;

use crate::article;
use crate::dictionary::Single;
use crate::error::DictError;

/// Pass 1: walks the typed fields, rendering text as-is, wrapping `t`
/// (transcription) fields in a span, and translating `x` (xdxf) markup.
/// Binary fields (`W`, `P`) and `y` (phonetic-only) fields are dropped -
/// they carry no renderable text.
pub fn render_fields(tagged: &[u8]) -> Result<String, DictError> {
    let mut out = String::new();
    for field in article::fields(tagged)? {
        match field.kind {
            b'm' | b'l' | b'g' => out.push_str(&String::from_utf8_lossy(field.payload)),
            b't' => {
                out.push_str("<span class=\"transcription\">");
                out.push_str(&String::from_utf8_lossy(field.payload));
                out.push_str("</span>");
            }
            b'x' => out.push_str(&xdxf_to_markup(&String::from_utf8_lossy(field.payload))),
            _ => {}
        }
    }
    Ok(out)
}

fn xdxf_to_markup(input: &str) -> String {
    let replaced = input
        .replace("<abr>", "<font class=\"abbreviature\">")
        .replace("</abr>", "</font>")
        .replace("<tr>", "<font class=\"transcription\">[")
        .replace("</tr>", "]</font>")
        .replace("<ex>", "<font class=\"example\">")
        .replace("</ex>", "</font>");
    strip_tag(&replaced, "k")
}

/// Removes every `<tag>...</tag>` span, keeping everything else.
fn strip_tag(input: &str, tag: &str) -> String {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find(&open) {
        out.push_str(&rest[..start]);
        let after = &rest[start + open.len()..];
        match after.find(&close) {
            Some(end) => rest = &after[end + close.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn abbreviation_pattern() -> Regex {
    Regex::new(r"_\S+[.:]").expect("static abbreviation pattern is valid")
}

/// Pass 2: expands `_abbrev.`/`_abbrev:` tokens by looking the stripped
/// abbreviation up in the same dictionary and recursively rendering (pass 1
/// only) its article, wrapped in an "explanation" span.
fn expand_abbreviations(dict: &mut Single, text: &str, pattern: &Regex) -> Result<String, DictError> {
    let mut out = String::new();
    let mut last = 0;

    for m in pattern.find_iter(text) {
        out.push_str(&text[last..m.start()]);
        let token = m.as_str();
        let trailing = token.chars().last();
        let stripped = token
            .trim_start_matches('_')
            .trim_end_matches(|c| c == '.' || c == ':');

        if let Some((idx, _)) = dict.lookup(stripped) {
            let raw = dict.data(idx)?;
            let rendered = render_fields(&raw)?;
            out.push_str("<span class=\"explanation\">");
            out.push_str(&rendered);
            out.push_str("</span>");
            if trailing == Some(':') {
                out.push(':');
            }
        } else {
            out.push_str(token);
        }
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Pass 3: turns `1>`/`1.`/`1)`-style sequential markers into an `<ol>`.
/// Keyed by the marker's delimiter character (`>`, `.`, or `)`), grounded on
/// `QStack<QChar> openedLists`: a marker continuing the innermost open
/// list's delimiter and count advances it; a marker of `1` with a
/// *different* delimiter than the innermost list nests a new `<ol>` inside
/// it; a marker of `1` with the *same* delimiter as the innermost list (the
/// sequence having already moved past `1`) closes that list and opens a
/// fresh, independent one in its place. All still-open lists are closed at
/// the end of the text.
fn reformat_lists(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut stack: Vec<(char, u32)> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_ascii_digit() {
            let start = i;
            let mut j = i;
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            if j < chars.len() && matches!(chars[j], '>' | '.' | ')') {
                let marker: u32 = chars[start..j].iter().collect::<String>().parse().unwrap_or(0);
                let delim = chars[j];
                let continues_top = matches!(stack.last(), Some(&(d, e)) if d == delim && e == marker);
                let restarts_top = marker == 1 && matches!(stack.last(), Some(&(d, _)) if d == delim);
                let opens_fresh = marker == 1 && !matches!(stack.last(), Some(&(d, _)) if d == delim);

                if continues_top || restarts_top || opens_fresh {
                    i = j + 1;
                    while i < chars.len() && chars[i].is_whitespace() {
                        i += 1;
                    }
                    while out.ends_with(' ') || out.ends_with('\n') {
                        out.pop();
                    }
                    if continues_top {
                        out.push_str("</li><li>");
                        stack.last_mut().unwrap().1 = marker + 1;
                    } else {
                        if restarts_top {
                            stack.pop();
                            out.push_str("</li></ol>");
                        }
                        out.push_str("<ol><li>");
                        stack.push((delim, marker + 1));
                    }
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    while stack.pop().is_some() {
        out.push_str("</li></ol>");
    }
    out
}

/// Pass 4: trims surrounding whitespace, turns `[...]` transcription
/// brackets into `<font class="transcription">` spans (matching the same
/// tag family Pass 1 uses for `<tr>` xdxf markup), expands tabs, and folds
/// runs of blank lines into paragraph breaks.
fn normalize_whitespace(text: &str) -> String {
    let mut bracketed = String::new();
    for c in text.trim().chars() {
        match c {
            '[' => bracketed.push_str("<font class=\"transcription\">"),
            ']' => bracketed.push_str("</font>"),
            '\t' => bracketed.push_str("&nbsp;&nbsp;&nbsp;&nbsp;"),
            other => bracketed.push(other),
        }
    }

    let mut out = String::new();
    let mut newline_run = 0usize;
    let flush = |run: usize, out: &mut String| {
        if run >= 2 {
            out.push_str("<br/><br/>");
        } else if run == 1 {
            out.push_str("<br/>");
        }
    };
    for c in bracketed.chars() {
        if c == '\n' {
            newline_run += 1;
        } else {
            flush(newline_run, &mut out);
            newline_run = 0;
            out.push(c);
        }
    }
    flush(newline_run, &mut out);
    out
}

/// Runs the full 4-pass pipeline over an already-reconstructed (fully
/// tagged) article body.
pub fn render(dict: &mut Single, tagged: &[u8]) -> Result<String, DictError> {
    let text = render_fields(tagged)?;
    let pattern = abbreviation_pattern();
    let text = expand_abbreviations(dict, &text, &pattern)?;
    let text = reformat_lists(&text);
    let text = normalize_whitespace(&text);
    Ok(text)
}
