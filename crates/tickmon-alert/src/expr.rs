//! Restricted expression grammar for alert conditions.
//!
//! Expressions are tokenized and parsed into a small AST, then evaluated
//! against one metrics row. Field names bind under their space-stripped
//! spelling, so a column named `"Market Cap"` is referenced as `MarketCap`.
//! There is deliberately no call or indexing syntax: a condition is
//! comparisons, arithmetic, and and/or/not over fields and literals, and
//! evaluation cannot touch anything outside the row it is given.
//!
//! Grammar, lowest to highest precedence:
//!
//! ```text
//! or_expr    := and_expr ( "or" and_expr )*
//! and_expr   := not_expr ( "and" not_expr )*
//! not_expr   := "not" not_expr | comparison
//! comparison := additive ( ("<"|"<="|">"|">="|"=="|"!=") additive )?
//! additive   := term ( ("+"|"-") term )*
//! term       := unary ( ("*"|"/"|"%") unary )*
//! unary      := "-" unary | primary
//! primary    := NUMBER | STRING | "true" | "false" | IDENT | "(" or_expr ")"
//! ```
//!
//! `&&`/`||`/`!` are accepted as spellings of and/or/not, and `True`/`False`
//! alongside `true`/`false`, because the stored expressions predate the
//! grammar.

use std::collections::HashMap;

use tickmon_common::types::{FieldValue, MetricsRow};

/// A condition that failed to tokenize, parse, or evaluate. Carries the
/// symbol of the row being evaluated so the log line can say which ticker
/// tripped it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("[{symbol}] {message}")]
pub struct EvalError {
    pub symbol: String,
    pub message: String,
}

impl EvalError {
    fn new(symbol: &str, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }
}

/// Evaluates `expression` against `row`. The expression must produce a
/// boolean; any failure (syntax, unknown field, type mismatch, division by
/// zero, non-boolean result) is an [`EvalError`], never a panic.
pub fn evaluate(expression: &str, row: &MetricsRow) -> Result<bool, EvalError> {
    let symbol = row.symbol().unwrap_or("???");
    let tokens = tokenize(expression).map_err(|m| EvalError::new(symbol, m))?;
    let ast = Parser::new(tokens)
        .parse()
        .map_err(|m| EvalError::new(symbol, m))?;
    let bindings = bind_row(row);
    match eval(&ast, &bindings).map_err(|m| EvalError::new(symbol, m))? {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::new(
            symbol,
            format!(
                "expression evaluated to a {} instead of a boolean",
                other.type_name()
            ),
        )),
    }
}

/// Strips spaces from field names so `"Market Cap"` binds as `MarketCap`.
fn bind_row(row: &MetricsRow) -> HashMap<String, &FieldValue> {
    row.fields
        .iter()
        .map(|(name, value)| (name.replace(' ', ""), value))
        .collect()
}

// ── Tokenizer ──

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    And,
    Or,
    Not,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' || c == '_' {
                        if c != '_' {
                            text.push(c);
                        }
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = text
                    .parse()
                    .map_err(|_| format!("invalid number literal `{text}`"))?;
                tokens.push(Token::Number(value));
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => text.push(c),
                        None => return Err("unterminated string literal".to_string()),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match text.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" | "True" => Token::True,
                    "false" | "False" => Token::False,
                    _ => Token::Ident(text),
                });
            }
            '<' => {
                chars.next();
                tokens.push(if chars.next_if_eq(&'=').is_some() {
                    Token::Le
                } else {
                    Token::Lt
                });
            }
            '>' => {
                chars.next();
                tokens.push(if chars.next_if_eq(&'=').is_some() {
                    Token::Ge
                } else {
                    Token::Gt
                });
            }
            '=' => {
                chars.next();
                if chars.next_if_eq(&'=').is_some() {
                    tokens.push(Token::Eq);
                } else {
                    return Err("`=` is not an operator; use `==`".to_string());
                }
            }
            '!' => {
                chars.next();
                tokens.push(if chars.next_if_eq(&'=').is_some() {
                    Token::Ne
                } else {
                    Token::Not
                });
            }
            '&' => {
                chars.next();
                if chars.next_if_eq(&'&').is_some() {
                    tokens.push(Token::And);
                } else {
                    return Err("`&` is not an operator; use `and` or `&&`".to_string());
                }
            }
            '|' => {
                chars.next();
                if chars.next_if_eq(&'|').is_some() {
                    tokens.push(Token::Or);
                } else {
                    return Err("`|` is not an operator; use `or` or `||`".to_string());
                }
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }

    Ok(tokens)
}

// ── Parser ──

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Field(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Or,
    And,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<Expr, String> {
        if self.tokens.is_empty() {
            return Err("empty expression".to_string());
        }
        let expr = self.or_expr()?;
        if self.pos < self.tokens.len() {
            return Err(format!(
                "unexpected trailing input after position {}",
                self.pos
            ));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Or) {
            let rhs = self.and_expr()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.not_expr()?;
        while self.eat(&Token::And) {
            let rhs = self.not_expr()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Not) {
            Ok(Expr::Not(Box::new(self.not_expr()?)))
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> Result<Expr, String> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.additive()?;
        Ok(binary(op, lhs, rhs))
    }

    fn additive(&mut self) -> Result<Expr, String> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Minus) {
            Ok(Expr::Neg(Box::new(self.unary()?)))
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::True) => Ok(Expr::Bool(true)),
            Some(Token::False) => Ok(Expr::Bool(false)),
            Some(Token::Ident(name)) => Ok(Expr::Field(name)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    Err("missing closing `)`".to_string())
                }
            }
            Some(other) => Err(format!("unexpected token {other:?}")),
            None => Err("expression ended unexpectedly".to_string()),
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

// ── Evaluation ──

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Bool(_) => "boolean",
        }
    }
}

fn eval(expr: &Expr, bindings: &HashMap<String, &FieldValue>) -> Result<Value, String> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::Text(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Field(name) => match bindings.get(name) {
            Some(FieldValue::Number(n)) => Ok(Value::Number(*n)),
            Some(FieldValue::Text(s)) => Ok(Value::Text(s.clone())),
            Some(FieldValue::Flag(b)) => Ok(Value::Bool(*b)),
            Some(FieldValue::Null) => Err(format!("field `{name}` has no value")),
            None => Err(format!("unknown field `{name}`")),
        },
        Expr::Not(inner) => match eval(inner, bindings)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(format!("`not` needs a boolean, got a {}", other.type_name())),
        },
        Expr::Neg(inner) => match eval(inner, bindings)? {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(format!(
                "unary `-` needs a number, got a {}",
                other.type_name()
            )),
        },
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, bindings),
    }
}

fn eval_binary(
    op: BinOp,
    lhs: &Expr,
    rhs: &Expr,
    bindings: &HashMap<String, &FieldValue>,
) -> Result<Value, String> {
    // and/or short-circuit; everything else evaluates both sides
    match op {
        BinOp::And => {
            return match eval(lhs, bindings)? {
                Value::Bool(false) => Ok(Value::Bool(false)),
                Value::Bool(true) => expect_bool(eval(rhs, bindings)?, "and"),
                other => Err(format!("`and` needs booleans, got a {}", other.type_name())),
            };
        }
        BinOp::Or => {
            return match eval(lhs, bindings)? {
                Value::Bool(true) => Ok(Value::Bool(true)),
                Value::Bool(false) => expect_bool(eval(rhs, bindings)?, "or"),
                other => Err(format!("`or` needs booleans, got a {}", other.type_name())),
            };
        }
        _ => {}
    }

    let lhs = eval(lhs, bindings)?;
    let rhs = eval(rhs, bindings)?;

    match op {
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a
                    .partial_cmp(b)
                    .ok_or_else(|| "values are not comparable".to_string())?,
                (Value::Text(a), Value::Text(b)) => a.cmp(b),
                _ => {
                    return Err(format!(
                        "cannot compare a {} with a {}",
                        lhs.type_name(),
                        rhs.type_name()
                    ));
                }
            };
            let result = match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        BinOp::Eq | BinOp::Ne => {
            let equal = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a == b,
                (Value::Text(a), Value::Text(b)) => a == b,
                (Value::Bool(a), Value::Bool(b)) => a == b,
                _ => {
                    return Err(format!(
                        "cannot compare a {} with a {}",
                        lhs.type_name(),
                        rhs.type_name()
                    ));
                }
            };
            Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }))
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
            let (Value::Number(a), Value::Number(b)) = (&lhs, &rhs) else {
                return Err(format!(
                    "arithmetic needs numbers, got a {} and a {}",
                    lhs.type_name(),
                    rhs.type_name()
                ));
            };
            let result = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div | BinOp::Rem if *b == 0.0 => {
                    return Err("division by zero".to_string());
                }
                BinOp::Div => a / b,
                _ => a % b,
            };
            Ok(Value::Number(result))
        }
        BinOp::And | BinOp::Or => unreachable!("handled above"),
    }
}

fn expect_bool(value: Value, op: &str) -> Result<Value, String> {
    match value {
        Value::Bool(_) => Ok(value),
        other => Err(format!("`{op}` needs booleans, got a {}", other.type_name())),
    }
}
