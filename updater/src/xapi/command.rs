//! Operational command encoding
//!
//! The XML API only accepts operational commands as XML documents. A CLI-style
//! command such as `show jobs id "7"` becomes one element per keyword, with a
//! quoted token becoming the text of the innermost element:
//! `<show><jobs><id>7</id></jobs></show>`.

/// Escape text for embedding in an XML element or attribute
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Keyword(String),
    Quoted(String),
}

fn tokenize(cmd: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = cmd.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' || c == '\'' {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some(q) if q == c => break,
                    Some(other) => value.push(other),
                    None => return Err(format!("Unterminated quote in command: {}", cmd)),
                }
            }
            tokens.push(Token::Quoted(value));
        } else {
            let mut word = String::new();
            while let Some(&w) = chars.peek() {
                if w.is_whitespace() || w == '"' || w == '\'' {
                    break;
                }
                word.push(w);
                chars.next();
            }
            tokens.push(Token::Keyword(word));
        }
    }

    Ok(tokens)
}

/// Convert a CLI-style operational command to its XML form
pub fn op_command_xml(cmd: &str) -> Result<String, String> {
    let tokens = tokenize(cmd)?;
    if tokens.is_empty() {
        return Err("Empty operational command".to_string());
    }

    let mut xml = String::new();
    let mut open: Vec<String> = Vec::new();

    for token in tokens {
        match token {
            Token::Keyword(word) => {
                xml.push_str(&format!("<{}>", word));
                open.push(word);
            }
            Token::Quoted(text) => {
                if open.is_empty() {
                    return Err(format!("Command starts with a quoted value: {}", cmd));
                }
                xml.push_str(&escape_xml(&text));
            }
        }
    }

    for word in open.iter().rev() {
        xml.push_str(&format!("</{}>", word));
    }

    Ok(xml)
}

/// `show jobs id "<id>"`
pub fn show_job(job_id: &str) -> String {
    format!("show jobs id \"{}\"", job_id)
}

/// `show system info`
pub fn show_system_info() -> &'static str {
    "show system info"
}

/// Install request for an uploaded package of the given category
pub fn install_request(category: &str, file_name: &str) -> String {
    format!(
        "<request><{cat}><upgrade><install><file>{file}</file></install></upgrade></{cat}></request>",
        cat = category,
        file = escape_xml(file_name)
    )
}
