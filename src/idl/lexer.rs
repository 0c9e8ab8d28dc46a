//! Tokens of the IDL notation.
//!
//! Whitespace and ordinary comments vanish here. A `/** ... */` doc comment is
//! not a token of its own: it rides on the next token as `doc`, so the parser
//! can pick it up when it starts a declaration without tracking state.

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    /// Identifier or dotted name. `escaped` marks backtick quoting, which
    /// turns keywords into plain names.
    Ident { text: String, escaped: bool },
    Str(String),
    Number(String),
    Punct(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
    pub col: usize,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

const PUNCT: &[char] = &['{', '}', '(', ')', '[', ']', '<', '>', ',', ';', ':', '=', '@', '?'];

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    col: usize,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    let mut lx = Lexer { chars: src.chars().peekable(), line: 1, col: 1 };
    let mut out = Vec::new();
    let mut doc: Option<String> = None;
    loop {
        lx.skip_whitespace();
        let (line, col) = (lx.line, lx.col);
        let Some(&c) = lx.chars.peek() else {
            out.push(Token { tok: Tok::Eof, line, col, doc: doc.take() });
            return Ok(out);
        };

        let tok = if c == '/' {
            lx.bump();
            match lx.chars.peek() {
                Some('/') => {
                    while let Some(&c) = lx.chars.peek() {
                        if c == '\n' { break; }
                        lx.bump();
                    }
                    continue;
                }
                Some('*') => {
                    lx.bump();
                    let is_doc = lx.chars.peek() == Some(&'*');
                    let body = lx.block_comment(line, col)?;
                    // `/**/` is an empty ordinary comment, not a doc comment
                    if is_doc && !body.is_empty() {
                        doc = Some(clean_doc(&body[1..]));
                    }
                    continue;
                }
                _ => return Err(LexError { line, col, message: "unexpected '/'".into() }),
            }
        } else if c == '"' {
            lx.bump();
            Tok::Str(lx.string(line, col)?)
        } else if c == '`' {
            lx.bump();
            let mut text = String::new();
            loop {
                match lx.bump() {
                    Some('`') => break,
                    Some(c) => text.push(c),
                    None => return Err(LexError { line, col, message: "unterminated backtick identifier".into() }),
                }
            }
            Tok::Ident { text, escaped: true }
        } else if c == '-' || c.is_ascii_digit() {
            Tok::Number(lx.number(line, col)?)
        } else if c.is_alphabetic() || c == '_' {
            let mut text = String::new();
            while let Some(&c) = lx.chars.peek() {
                if c.is_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    text.push(c);
                    lx.bump();
                } else {
                    break;
                }
            }
            Tok::Ident { text, escaped: false }
        } else if PUNCT.contains(&c) {
            lx.bump();
            Tok::Punct(c)
        } else {
            return Err(LexError { line, col, message: format!("unexpected character {c:?}") });
        };
        out.push(Token { tok, line, col, doc: doc.take() });
    }
}

impl Lexer<'_> {
    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if !c.is_whitespace() { break; }
            self.bump();
        }
    }

    /// Body of a `/* */` comment, opening already consumed.
    fn block_comment(&mut self, line: usize, col: usize) -> Result<String, LexError> {
        let mut body = String::new();
        loop {
            match self.bump() {
                Some('*') if self.chars.peek() == Some(&'/') => {
                    self.bump();
                    return Ok(body);
                }
                Some(c) => body.push(c),
                None => return Err(LexError { line, col, message: "unterminated comment".into() }),
            }
        }
    }

    /// JSON-style string body, opening quote already consumed.
    fn string(&mut self, line: usize, col: usize) -> Result<String, LexError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('b') => out.push('\u{8}'),
                    Some('f') => out.push('\u{c}'),
                    Some('u') => {
                        let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| LexError { line, col, message: format!("bad unicode escape \\u{hex}") })?;
                        out.push(code);
                    }
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(LexError { line, col, message: "unterminated string".into() })
    }

    fn number(&mut self, line: usize, col: usize) -> Result<String, LexError> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if text.chars().any(|c| c.is_ascii_digit()) {
            Ok(text)
        } else {
            Err(LexError { line, col, message: format!("malformed number {text:?}") })
        }
    }
}

/// Strip the leading `*` gutter that doc comments conventionally carry.
fn clean_doc(body: &str) -> String {
    let lines: Vec<&str> = body
        .lines()
        .map(|l| {
            let t = l.trim();
            t.strip_prefix('*').map(str::trim_start).unwrap_or(t)
        })
        .collect();
    lines.join("\n").trim().to_string()
}
