use cadlisp_core::{LispError, Span, Value};

use crate::lexer::{tokenize, SpannedToken, Token};

/// Deepest bracket or reader-macro nesting accepted in one form.
pub const MAX_NESTING_DEPTH: usize = 1024;

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.span)
            .unwrap_or(Span { line: 0, col: 0 })
    }

    fn advance(&mut self) -> Option<&SpannedToken> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: impl Into<String>) -> LispError {
        LispError::Reader {
            message: message.into(),
            span: self.span(),
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), LispError> {
        let span = self.span();
        match self.advance() {
            Some(t) if &t.token == expected => Ok(()),
            Some(t) => Err(LispError::Reader {
                message: format!("expected {expected:?}, got {:?}", t.token),
                span,
            }),
            None => Err(LispError::Reader {
                message: format!("expected {expected:?}, got end of input"),
                span,
            }),
        }
    }

    fn parse_expr(&mut self) -> Result<Value, LispError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(format!(
                "form nested deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }
        self.depth += 1;
        let result = self.parse_form();
        self.depth -= 1;
        result
    }

    fn parse_form(&mut self) -> Result<Value, LispError> {
        let macro_name = match self.peek() {
            None => return Err(self.error("unexpected end of input")),
            Some(Token::LParen) => return self.parse_list(),
            Some(Token::LBracket) => return self.parse_vector(),
            Some(Token::LBrace) => return self.parse_map(),
            Some(Token::Quote) => "quote",
            Some(Token::Quasiquote) => "quasiquote",
            Some(Token::Unquote) => "unquote",
            Some(Token::UnquoteSplice) => "splice-unquote",
            Some(Token::Deref) => "deref",
            Some(_) => return self.parse_atom(),
        };
        self.advance();
        let inner = self.parse_expr()?;
        Ok(Value::list(vec![Value::symbol(macro_name), inner]))
    }

    fn parse_list(&mut self) -> Result<Value, LispError> {
        self.expect(&Token::LParen)?;
        let mut items = Vec::new();
        while self.peek() != Some(&Token::RParen) {
            if self.peek().is_none() {
                return Err(self.error("unterminated list"));
            }
            // (a b . c): exactly one form between the dot and the paren
            if self.peek() == Some(&Token::Dot) {
                if items.is_empty() {
                    return Err(self.error("'.' must follow at least one element"));
                }
                self.advance();
                if self.peek() == Some(&Token::RParen) {
                    return Err(self.error("expected a form after '.'"));
                }
                let tail = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                items.push(Value::symbol("."));
                items.push(tail);
                return Ok(Value::list(items));
            }
            items.push(self.parse_expr()?);
        }
        self.expect(&Token::RParen)?;
        Ok(Value::list(items))
    }

    fn parse_vector(&mut self) -> Result<Value, LispError> {
        self.expect(&Token::LBracket)?;
        let mut items = Vec::new();
        while self.peek() != Some(&Token::RBracket) {
            if self.peek().is_none() {
                return Err(self.error("unterminated vector"));
            }
            items.push(self.parse_expr()?);
        }
        self.expect(&Token::RBracket)?;
        Ok(Value::vector(items))
    }

    fn parse_map(&mut self) -> Result<Value, LispError> {
        self.expect(&Token::LBrace)?;
        let mut entries = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            if self.peek().is_none() {
                return Err(self.error("unterminated map"));
            }
            let key = self.parse_expr()?;
            if self.peek() == Some(&Token::RBrace) || self.peek().is_none() {
                return Err(self.error("map literal must have even number of forms"));
            }
            let val = self.parse_expr()?;
            entries.push((key, val));
        }
        self.expect(&Token::RBrace)?;
        Ok(Value::hashmap(entries))
    }

    fn parse_atom(&mut self) -> Result<Value, LispError> {
        let span = self.span();
        let value = match self.advance().map(|t| &t.token) {
            Some(Token::Int(n)) => Value::Int(*n),
            Some(Token::Real(f)) => Value::Real(*f),
            Some(Token::String(s)) => Value::string(s),
            Some(Token::Symbol(s)) => Value::symbol(s),
            Some(Token::Keyword(s)) => Value::keyword(s),
            Some(Token::Bool(b)) => Value::Bool(*b),
            Some(Token::Nil) => Value::Nil,
            Some(Token::Dot) => {
                return Err(LispError::Reader {
                    message: "unexpected '.'".to_string(),
                    span,
                })
            }
            Some(other) => {
                return Err(LispError::Reader {
                    message: format!("unexpected token: {other:?}"),
                    span,
                })
            }
            None => {
                return Err(LispError::Reader {
                    message: "unexpected end of input".to_string(),
                    span,
                })
            }
        };
        Ok(value)
    }
}

/// Reads one top-level form per call from a buffer, remembering its position.
///
/// ```
/// use cadlisp_reader::Reader;
///
/// let mut reader = Reader::new("(+ 1 2) 'x").unwrap();
/// assert_eq!(reader.read_next().unwrap().unwrap().to_string(), "(+ 1 2)");
/// assert_eq!(reader.read_next().unwrap().unwrap().to_string(), "(quote x)");
/// assert!(reader.read_next().unwrap().is_none());
/// ```
pub struct Reader {
    parser: Parser,
}

impl Reader {
    pub fn new(input: &str) -> Result<Reader, LispError> {
        Ok(Reader {
            parser: Parser::new(tokenize(input)?),
        })
    }

    /// The next form, or `None` once the buffer is exhausted.
    pub fn read_next(&mut self) -> Result<Option<Value>, LispError> {
        if self.parser.peek().is_none() {
            return Ok(None);
        }
        self.parser.parse_expr().map(Some)
    }

    pub fn is_at_end(&self) -> bool {
        self.parser.peek().is_none()
    }
}

impl Iterator for Reader {
    type Item = Result<Value, LispError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

/// Read the first form of `input`; an empty buffer reads as nil.
pub fn read_str(input: &str) -> Result<Value, LispError> {
    Ok(Reader::new(input)?.read_next()?.unwrap_or(Value::Nil))
}

/// Read every form in `input`.
pub fn read_many(input: &str) -> Result<Vec<Value>, LispError> {
    Reader::new(input)?.collect()
}
