//! Normalises generated text before it is stored.

pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a response. Please try again.";

pub fn sanitize_response(text: &str) -> String {
    if text.is_empty() {
        return EMPTY_REPLY.to_string();
    }

    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2022}' | '\u{25CF}' => out.push_str("- "),
            '\u{200B}'..='\u{200D}' | '\u{FEFF}' => {}
            // Newlines survive so paragraphs stay readable.
            '\n' => out.push('\n'),
            c if c.is_ascii_control() => {}
            c => out.push(c),
        }
    }

    collapse_newlines(&out).trim().to_string()
}

/// Runs of three or more newlines become exactly two.
fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run <= 2 {
                out.push(c);
            }
        } else {
            run = 0;
            out.push(c);
        }
    }
    out
}
