// src/parser.rs

#[derive(Debug)]
pub enum ParseError {
    InvalidSyntax(String),
}

impl From<String> for ParseError {
    fn from(msg: String) -> Self {
        ParseError::InvalidSyntax(msg)
    }
}

/// Character cursor shared by the expression grammar.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn parse_identifier(&mut self) -> Result<&'a str, ParseError> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c == '_' || c == '$' || c.is_ascii_alphanumeric() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(ParseError::InvalidSyntax("identifier expected".into()));
        }
        Ok(&self.s[start..self.i])
    }

    /// Unsigned decimal literal: `12`, `1.5`, `.5`, `2e3`. Signs are unary operators.
    pub fn parse_number_literal(&mut self) -> Result<f64, ParseError> {
        let start = self.i;
        self.eat_digits();
        if self.peek_char() == Some('.') {
            self.i += 1;
            self.eat_digits();
        }
        let mantissa = &self.s[start..self.i];
        if mantissa.is_empty() || mantissa == "." {
            return Err(ParseError::InvalidSyntax("number expected".into()));
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            self.i += 1;
            if matches!(self.peek_char(), Some('+') | Some('-')) {
                self.i += 1;
            }
            let exp_start = self.i;
            self.eat_digits();
            if self.i == exp_start {
                return Err(ParseError::InvalidSyntax("bad exponent".into()));
            }
        }
        self.s[start..self.i]
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidSyntax("bad number".into()))
    }

    fn eat_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
    }

    pub fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        let quote = self
            .peek_char()
            .ok_or_else(|| ParseError::InvalidSyntax("string".into()))?;
        if quote != '\'' && quote != '"' {
            return Err(ParseError::InvalidSyntax("expected quoted string".into()));
        }
        self.i += 1;
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                if let Some(nc) = self.peek_char() {
                    self.i += nc.len_utf8();
                    match nc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        // JS drops the backslash of an unknown escape
                        other => out.push(other),
                    }
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        Err(ParseError::InvalidSyntax("unterminated string".into()))
    }

    pub fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(ParseError::InvalidSyntax(format!("expected '{}'", c)))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn consume_str(&mut self, lit: &str) -> bool {
        if self.peek_str(lit) {
            self.i += lit.len();
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers() {
        assert_eq!(Parser::new("12").parse_number_literal().unwrap(), 12.0);
        assert_eq!(Parser::new(".5").parse_number_literal().unwrap(), 0.5);
        assert_eq!(Parser::new("2e3").parse_number_literal().unwrap(), 2000.0);
        assert!(Parser::new(".").parse_number_literal().is_err());
        assert!(Parser::new("1e").parse_number_literal().is_err());
    }

    #[test]
    fn quoted_strings() {
        let mut p = Parser::new(r#"'it\'s' "naïve""#);
        assert_eq!(p.parse_quoted_string().unwrap(), "it's");
        p.skip_ws();
        assert_eq!(p.parse_quoted_string().unwrap(), "naïve");
        assert!(p.eof());
        assert!(Parser::new("'open").parse_quoted_string().is_err());
    }
}
