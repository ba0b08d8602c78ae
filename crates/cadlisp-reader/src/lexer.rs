use cadlisp_core::{LispError, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplice,
    Deref,
    Int(i64),
    Real(f64),
    String(String),
    Symbol(String),
    Keyword(String),
    Bool(bool),
    Nil,
    Dot,
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, ',' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | '\'' | '`')
}

pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, LispError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut line = 1;
    let mut col = 1;

    while i < chars.len() {
        let ch = chars[i];
        let span = Span { line, col };

        let simple = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '\'' => Some(Token::Quote),
            '`' => Some(Token::Quasiquote),
            _ => None,
        };
        if let Some(token) = simple {
            tokens.push(SpannedToken { token, span });
            i += 1;
            col += 1;
            continue;
        }

        match ch {
            '\n' => {
                line += 1;
                col = 1;
                i += 1;
            }
            // Commas are whitespace
            c if c.is_whitespace() || c == ',' => {
                col += 1;
                i += 1;
            }

            ';' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }

            // `~x` unquotes and `@x` dereferences; a lone `~` is the bitwise-not symbol.
            '~' | '@' if i + 1 < chars.len() && !is_delimiter(chars[i + 1]) || ch == '@' => {
                let token = if ch == '@' {
                    i += 1;
                    col += 1;
                    Token::Deref
                } else if chars[i + 1] == '@' {
                    i += 2;
                    col += 2;
                    Token::UnquoteSplice
                } else {
                    i += 1;
                    col += 1;
                    Token::Unquote
                };
                tokens.push(SpannedToken { token, span });
            }

            '"' => {
                let mut s = String::new();
                i += 1;
                col += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        i += 1;
                        col += 1;
                        match chars[i] {
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            'r' => s.push('\r'),
                            'e' => s.push('\u{1b}'),
                            '\\' => s.push('\\'),
                            '"' => s.push('"'),
                            other => {
                                s.push('\\');
                                s.push(other);
                            }
                        }
                    } else {
                        if chars[i] == '\n' {
                            line += 1;
                            col = 0;
                        }
                        s.push(chars[i]);
                    }
                    i += 1;
                    col += 1;
                }
                if i >= chars.len() {
                    return Err(LispError::Reader {
                        message: "unterminated string".to_string(),
                        span,
                    });
                }
                i += 1; // closing quote
                col += 1;
                tokens.push(SpannedToken {
                    token: Token::String(s),
                    span,
                });
            }

            _ => {
                let start = i;
                while i < chars.len() && !is_delimiter(chars[i]) {
                    i += 1;
                    col += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let token = classify(&text, span)?;
                tokens.push(SpannedToken { token, span });
            }
        }
    }

    Ok(tokens)
}

/// Turn a bare atom into a token: constants, keywords, numbers, or a symbol.
fn classify(text: &str, span: Span) -> Result<Token, LispError> {
    match text {
        "nil" => return Ok(Token::Nil),
        "true" => return Ok(Token::Bool(true)),
        "false" => return Ok(Token::Bool(false)),
        "." => return Ok(Token::Dot),
        _ => {}
    }
    if let Some(name) = text.strip_prefix(':') {
        if name.is_empty() {
            return Err(LispError::Reader {
                message: "expected keyword name after ':'".to_string(),
                span,
            });
        }
        return Ok(Token::Keyword(name.to_string()));
    }
    if let Some(token) = read_number(text, span)? {
        return Ok(token);
    }
    Ok(Token::Symbol(text.to_string()))
}

fn read_number(text: &str, span: Span) -> Result<Option<Token>, LispError> {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() {
        return Ok(None);
    }

    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        let bad = || LispError::Reader {
            message: format!("bad numeric token: {text}"),
            span,
        };
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let n = i64::from_str_radix(hex, 16).map_err(|_| bad())?;
        return Ok(Some(Token::Int(if negative { -n } else { n })));
    }

    if digits.bytes().all(|b| b.is_ascii_digit()) {
        let n: i64 = text.parse().map_err(|_| LispError::Reader {
            message: format!("integer literal out of range: {text}"),
            span,
        })?;
        return Ok(Some(Token::Int(n)));
    }

    let starts_numeric = digits
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_digit() || b == b'.');
    let numeric_chars = digits
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if starts_numeric && numeric_chars && digits.bytes().any(|b| b.is_ascii_digit()) {
        if let Ok(f) = text.parse::<f64>() {
            return Ok(Some(Token::Real(f)));
        }
        // `1+` and `1-` stay symbols; a fraction or exponent commits to a number.
        if digits.bytes().any(|b| matches!(b, b'.' | b'e' | b'E')) {
            return Err(LispError::Reader {
                message: format!("bad numeric token: {text}"),
                span,
            });
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn numbers() {
        assert_eq!(toks("42 -7 0x1F -0x10"), vec![
            Token::Int(42),
            Token::Int(-7),
            Token::Int(31),
            Token::Int(-16),
        ]);
        assert_eq!(toks("3.5 1e3 -2.5E-1 .5"), vec![
            Token::Real(3.5),
            Token::Real(1000.0),
            Token::Real(-0.25),
            Token::Real(0.5),
        ]);
    }

    #[test]
    fn digit_led_symbols() {
        assert_eq!(toks("1+ 1-"), vec![
            Token::Symbol("1+".into()),
            Token::Symbol("1-".into()),
        ]);
        assert_eq!(toks("- +"), vec![
            Token::Symbol("-".into()),
            Token::Symbol("+".into()),
        ]);
    }

    #[test]
    fn bad_hex_is_error() {
        assert!(tokenize("0xZZ").is_err());
        assert!(tokenize("99999999999999999999").is_err());
        assert!(tokenize("0x-1").is_err());
        assert!(tokenize("0x+5").is_err());
        assert!(tokenize("-0x").is_err());
    }

    #[test]
    fn malformed_numbers_are_errors() {
        for bad in ["1.2.3", "1e", "2.5e+", "-1.2.3", "3..4"] {
            let err = tokenize(bad).unwrap_err();
            assert!(err.to_string().contains("bad numeric token"), "{bad}: {err}");
        }
        assert_eq!(toks("1-2"), vec![Token::Symbol("1-2".into())]);
    }

    #[test]
    fn reader_macros() {
        assert_eq!(toks("'a `b ~c ~@d @e"), vec![
            Token::Quote,
            Token::Symbol("a".into()),
            Token::Quasiquote,
            Token::Symbol("b".into()),
            Token::Unquote,
            Token::Symbol("c".into()),
            Token::UnquoteSplice,
            Token::Symbol("d".into()),
            Token::Deref,
            Token::Symbol("e".into()),
        ]);
    }

    #[test]
    fn lone_tilde_is_a_symbol() {
        assert_eq!(toks("(~ 5)"), vec![
            Token::LParen,
            Token::Symbol("~".into()),
            Token::Int(5),
            Token::RParen,
        ]);
    }

    #[test]
    fn commas_and_comments_are_skipped() {
        assert_eq!(toks("1, 2 ; three\n4"), vec![
            Token::Int(1),
            Token::Int(2),
            Token::Int(4),
        ]);
    }

    #[test]
    fn constants_and_dot() {
        assert_eq!(toks("nil true false . :k"), vec![
            Token::Nil,
            Token::Bool(true),
            Token::Bool(false),
            Token::Dot,
            Token::Keyword("k".into()),
        ]);
    }

    #[test]
    fn string_escapes_and_spans() {
        let tokens = tokenize("\n  \"a\\n\\\"b\\\\\"").unwrap();
        assert_eq!(tokens[0].token, Token::String("a\n\"b\\".into()));
        assert_eq!(tokens[0].span, Span::point(2, 3));
    }

    #[test]
    fn unterminated_string() {
        let err = tokenize("\"abc").unwrap_err();
        assert!(err.to_string().contains("unterminated string"));
    }
}
