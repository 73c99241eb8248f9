//! CSS escaping for identifiers and quoted attribute values

/// Escape an identifier the way `CSS.escape` does.
pub fn escape_ident(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());

    for (idx, &ch) in chars.iter().enumerate() {
        let code = ch as u32;
        if ch == '\0' {
            out.push('\u{FFFD}');
        } else if (0x01..=0x1f).contains(&code) || code == 0x7f {
            push_hex_escape(&mut out, ch);
        } else if idx == 0 && ch.is_ascii_digit() {
            push_hex_escape(&mut out, ch);
        } else if idx == 1 && ch.is_ascii_digit() && chars[0] == '-' {
            push_hex_escape(&mut out, ch);
        } else if idx == 0 && ch == '-' && chars.len() == 1 {
            out.push('\\');
            out.push(ch);
        } else if code >= 0x80 || ch == '-' || ch == '_' || ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }

    out
}

/// Escape a value for use inside a double-quoted attribute selector.
pub fn escape_attr_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' | '\r' | '\u{c}' => push_hex_escape(&mut out, ch),
            _ => out.push(ch),
        }
    }
    out
}

fn push_hex_escape(out: &mut String, ch: char) {
    out.push_str(&format!("\\{:x} ", ch as u32));
}
