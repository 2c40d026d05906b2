// src/expression.rs
use crate::comparison::{cmp_values, loose_eq, strict_eq, to_display_string, to_number, truthy};
use crate::parser::{ParseError, Parser};

const MAX_DEPTH: usize = 64;

/// Runtime value of a condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    Undefined,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Pos(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CmpOp {
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    let mut p = EParser::new(input);
    let node = p.parse_or()?;
    p.parser.skip_ws();
    if !p.parser.eof() {
        return Err(ParseError::InvalidSyntax("trailing input".into()));
    }
    Ok(node)
}

struct EParser<'a> {
    parser: Parser<'a>,
    depth: usize,
}

impl<'a> EParser<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            parser: Parser::new(s),
            depth: 0,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        let mut links = 0;
        loop {
            self.parser.skip_ws();
            if self.parser.consume_str("||") {
                self.descend()?;
                links += 1;
                let right = self.parse_and()?;
                left = Expr::Or(Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        let mut links = 0;
        loop {
            self.parser.skip_ws();
            if self.parser.consume_str("&&") {
                self.descend()?;
                links += 1;
                let right = self.parse_equality()?;
                left = Expr::And(Box::new(left), Box::new(right));
            } else {
                break;
            }
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        let mut links = 0;
        loop {
            self.parser.skip_ws();
            // longest operator first
            let op = if self.parser.consume_str("===") {
                CmpOp::StrictEq
            } else if self.parser.consume_str("!==") {
                CmpOp::StrictNe
            } else if self.parser.consume_str("==") {
                CmpOp::Eq
            } else if self.parser.consume_str("!=") {
                CmpOp::Ne
            } else {
                break;
            };
            self.descend()?;
            links += 1;
            let right = self.parse_relational()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        let mut links = 0;
        loop {
            self.parser.skip_ws();
            let op = if self.parser.consume_str("<=") {
                CmpOp::Lte
            } else if self.parser.consume_str(">=") {
                CmpOp::Gte
            } else if self.parser.consume_char('<') {
                CmpOp::Lt
            } else if self.parser.consume_char('>') {
                CmpOp::Gt
            } else {
                break;
            };
            self.descend()?;
            links += 1;
            let right = self.parse_additive()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        let mut links = 0;
        loop {
            self.parser.skip_ws();
            let op = if self.parser.consume_char('+') {
                ArithOp::Add
            } else if self.parser.consume_char('-') {
                ArithOp::Sub
            } else {
                break;
            };
            self.descend()?;
            links += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        let mut links = 0;
        loop {
            self.parser.skip_ws();
            let op = if self.parser.consume_char('*') {
                ArithOp::Mul
            } else if self.parser.consume_char('/') {
                ArithOp::Div
            } else if self.parser.consume_char('%') {
                ArithOp::Rem
            } else {
                break;
            };
            self.descend()?;
            links += 1;
            let right = self.parse_unary()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.parser.skip_ws();
        self.descend()?;
        let node = if self.parser.consume_char('!') {
            Expr::Not(Box::new(self.parse_unary()?))
        } else if self.parser.consume_char('-') {
            Expr::Neg(Box::new(self.parse_unary()?))
        } else if self.parser.consume_char('+') {
            Expr::Pos(Box::new(self.parse_unary()?))
        } else {
            self.parse_primary()?
        };
        self.depth -= 1;
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.parser.skip_ws();
        match self.parser.peek_char() {
            Some('(') => {
                self.parser.consume_char('(');
                let inner = self.parse_or()?;
                self.parser.skip_ws();
                self.parser.expect(')')?;
                Ok(inner)
            }
            Some('"') | Some('\'') => {
                Ok(Expr::Literal(Value::Str(self.parser.parse_quoted_string()?)))
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                Ok(Expr::Literal(Value::Number(self.parser.parse_number_literal()?)))
            }
            Some(_) => {
                let ident = self.parser.parse_identifier()?;
                match ident {
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "null" => Ok(Expr::Literal(Value::Null)),
                    "undefined" => Ok(Expr::Literal(Value::Undefined)),
                    "NaN" => Ok(Expr::Literal(Value::Number(f64::NAN))),
                    "Infinity" => Ok(Expr::Literal(Value::Number(f64::INFINITY))),
                    other => Err(ParseError::InvalidSyntax(format!(
                        "`{other}` is not defined"
                    ))),
                }
            }
            None => Err(ParseError::InvalidSyntax("unexpected end of input".into())),
        }
    }

    /// Charged once per nesting level and once per binary operator, so the
    /// finished tree is never deeper than `MAX_DEPTH`.
    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::InvalidSyntax("expression nested too deeply".into()));
        }
        Ok(())
    }
}

/// Evaluate AST node → Value
pub fn eval_ast(node: &Expr) -> Value {
    match node {
        Expr::Literal(v) => v.clone(),
        Expr::Not(inner) => Value::Bool(!truthy(&eval_ast(inner))),
        Expr::Neg(inner) => Value::Number(-to_number(&eval_ast(inner))),
        Expr::Pos(inner) => Value::Number(to_number(&eval_ast(inner))),
        // `&&` / `||` yield one of their operands, not a coerced bool
        Expr::And(l, r) => {
            let left = eval_ast(l);
            if truthy(&left) {
                eval_ast(r)
            } else {
                left
            }
        }
        Expr::Or(l, r) => {
            let left = eval_ast(l);
            if truthy(&left) {
                left
            } else {
                eval_ast(r)
            }
        }
        Expr::Compare(op, l, r) => {
            let (a, b) = (eval_ast(l), eval_ast(r));
            Value::Bool(match op {
                CmpOp::Eq => loose_eq(&a, &b),
                CmpOp::Ne => !loose_eq(&a, &b),
                CmpOp::StrictEq => strict_eq(&a, &b),
                CmpOp::StrictNe => !strict_eq(&a, &b),
                CmpOp::Lt => cmp_values(&a, &b, |o| o.is_lt()),
                CmpOp::Lte => cmp_values(&a, &b, |o| o.is_le()),
                CmpOp::Gt => cmp_values(&a, &b, |o| o.is_gt()),
                CmpOp::Gte => cmp_values(&a, &b, |o| o.is_ge()),
            })
        }
        Expr::Arith(op, l, r) => {
            let (a, b) = (eval_ast(l), eval_ast(r));
            match op {
                ArithOp::Add => match (&a, &b) {
                    (Value::Str(_), _) | (_, Value::Str(_)) => {
                        Value::Str(to_display_string(&a) + &to_display_string(&b))
                    }
                    _ => Value::Number(to_number(&a) + to_number(&b)),
                },
                ArithOp::Sub => Value::Number(to_number(&a) - to_number(&b)),
                ArithOp::Mul => Value::Number(to_number(&a) * to_number(&b)),
                ArithOp::Div => Value::Number(to_number(&a) / to_number(&b)),
                ArithOp::Rem => Value::Number(to_number(&a) % to_number(&b)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(src: &str) -> Value {
        eval_ast(&parse_expr(src).unwrap())
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("1 + 2 * 3"), Value::Number(7.0));
        assert_eq!(eval("(1 + 2) * 3"), Value::Number(9.0));
        assert_eq!(eval("10 - 4 - 3"), Value::Number(3.0));
        assert_eq!(eval("7 % 4 == 3 && !false"), Value::Bool(true));
        assert_eq!(eval("1 < 2 == true"), Value::Bool(true));
        assert_eq!(eval("-2 * -2"), Value::Number(4.0));
    }

    #[test]
    fn logical_operators_return_operands() {
        assert_eq!(eval("0 || 'x'"), Value::Str("x".into()));
        assert_eq!(eval("1 && 2"), Value::Number(2.0));
        assert_eq!(eval("'' && true"), Value::Str(String::new()));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(eval("'a' + 1 + 2"), Value::Str("a12".into()));
        assert_eq!(eval("1 + 2 + 'a'"), Value::Str("3a".into()));
    }

    #[test]
    fn comparisons_across_types() {
        assert_eq!(eval("\"test\" == 'test'"), Value::Bool(true));
        assert_eq!(eval("5 == '5'"), Value::Bool(true));
        assert_eq!(eval("5 === '5'"), Value::Bool(false));
        assert_eq!(eval("5 !== '5'"), Value::Bool(true));
        assert_eq!(eval("3 >= 3 && 2 <= 1"), Value::Bool(false));
    }

    #[test]
    fn rejects_invalid_text() {
        for src in [
            "",
            "{x} == 'a'",
            "x == 1",
            "1 = 1",
            "(1 == 1",
            "1 == 1)",
            "1 & 1",
            "$this.show()",
            "'open",
        ] {
            assert!(parse_expr(src).is_err(), "{src:?} should not parse");
        }
    }

    #[test]
    fn depth_is_bounded() {
        let deep = "(".repeat(200) + "1" + &")".repeat(200);
        assert!(parse_expr(&deep).is_err());
        let shallow = "(".repeat(20) + "1" + &")".repeat(20);
        assert_eq!(eval(&shallow), Value::Number(1.0));

        // left-associative chains grow the tree as fast as parentheses do
        assert!(parse_expr(&vec!["1 == 1"; 5_000].join(" || ")).is_err());
        assert!(parse_expr(&("1 + ".repeat(50_000) + "1")).is_err());
        assert!(parse_expr(&vec!["1"; 5_000].join(" * ")).is_err());
        assert_eq!(eval(&vec!["1 == 2"; 20].join(" || ")), Value::Bool(false));
        assert_eq!(eval(&("1 + ".repeat(30) + "1")), Value::Number(31.0));
    }
}
