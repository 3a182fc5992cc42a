//! Arithmetic calculator tool.
//!
//! Accepts digits, `+ - * / // ** . ( )` and spaces. `**` is right-associative
//! and binds tighter than a leading sign, so `-2 ** 2` is `-4`. Integer operands
//! stay integers for `+ - * // **` (a negative exponent gives a float); `/` and
//! any decimal operand are evaluated in floating point.

use crate::error::{AgentError, Result};

/// Deepest nesting of parentheses, signs and exponents accepted.
const MAX_DEPTH: usize = 128;

/// Result of evaluating an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{:?}", x),
        }
    }
}

/// Evaluate an expression and format it the way the model-facing tools do.
pub fn calculate(expression: &str) -> String {
    match evaluate(expression) {
        Ok(result) => format!(
            "CALCULATION RESULT:\nExpression: {}\nResult: {}\nType: Arithmetic calculation",
            expression, result
        ),
        Err(e) => format!("CALCULATION ERROR: {}\nExpression: {}", e, expression),
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<Number> {
    if let Some(c) = expression
        .chars()
        .find(|c| !"0123456789+-*/.() ".contains(*c))
    {
        return Err(AgentError::Tool(format!("unsupported character {:?}", c)));
    }

    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;

    if parser.pos != parser.tokens.len() {
        return Err(AgentError::Tool(format!(
            "unexpected token {:?}",
            parser.tokens[parser.pos]
        )));
    }

    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Op(Op),
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let doubled = chars.get(i + 1) == Some(&c);
        match c {
            ' ' => i += 1,
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '*' | '/' if doubled => {
                tokens.push(Token::Op(if c == '*' { Op::Pow } else { Op::FloorDiv }));
                i += 2;
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(match c {
                    '+' => Op::Add,
                    '-' => Op::Sub,
                    '*' => Op::Mul,
                    _ => Op::Div,
                }));
                i += 1;
            }
            _ => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = if literal.contains('.') {
                    literal.parse::<f64>().map(Number::Float)
                        .map_err(|_| AgentError::Tool(format!("invalid number {:?}", literal)))?
                } else {
                    literal.parse::<i64>().map(Number::Int)
                        .map_err(|_| AgentError::Tool(format!("invalid number {:?}", literal)))?
                };
                tokens.push(Token::Num(number));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Number> {
        let mut left = self.term()?;
        while let Some(Token::Op(op @ (Op::Add | Op::Sub))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.term()?;
            left = apply(op, left, right)?;
        }
        Ok(left)
    }

    // term := unary (('*' | '/' | '//') unary)*
    fn term(&mut self) -> Result<Number> {
        let mut left = self.unary()?;
        while let Some(Token::Op(op @ (Op::Mul | Op::Div | Op::FloorDiv))) = self.peek().cloned()
        {
            self.pos += 1;
            let right = self.unary()?;
            left = apply(op, left, right)?;
        }
        Ok(left)
    }

    // Every recursive path passes through here, so this is where nesting is bounded.
    fn unary(&mut self) -> Result<Number> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(AgentError::Tool("expression nested too deeply".to_string()));
        }
        let value = self.signed();
        self.depth -= 1;
        value
    }

    // signed := ('+' | '-') unary | power
    fn signed(&mut self) -> Result<Number> {
        match self.peek() {
            Some(Token::Op(Op::Sub)) => {
                self.pos += 1;
                match self.unary()? {
                    Number::Int(i) => i
                        .checked_neg()
                        .map(Number::Int)
                        .ok_or_else(|| AgentError::Tool("integer overflow".to_string())),
                    Number::Float(f) => Ok(Number::Float(-f)),
                }
            }
            Some(Token::Op(Op::Add)) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := primary ('**' unary)?
    fn power(&mut self) -> Result<Number> {
        let base = self.primary()?;
        if let Some(Token::Op(Op::Pow)) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return apply(Op::Pow, base, exponent);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Number> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::Open) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(AgentError::Tool("missing closing parenthesis".to_string())),
                }
            }
            Some(token) => Err(AgentError::Tool(format!("unexpected token {:?}", token))),
            None => Err(AgentError::Tool("unexpected end of expression".to_string())),
        }
    }
}

fn apply(op: Op, left: Number, right: Number) -> Result<Number> {
    let overflow = || AgentError::Tool("integer overflow".to_string());
    let zero_division = || AgentError::Tool("division by zero".to_string());

    match op {
        Op::Div => {
            let divisor = right.as_f64();
            if divisor == 0.0 {
                return Err(zero_division());
            }
            Ok(Number::Float(left.as_f64() / divisor))
        }
        Op::FloorDiv => match (left, right) {
            (Number::Int(_), Number::Int(0)) => Err(zero_division()),
            (Number::Int(a), Number::Int(b)) => {
                let q = a.checked_div(b).ok_or_else(overflow)?;
                // Round toward negative infinity when the signs differ.
                if a % b != 0 && (a < 0) != (b < 0) {
                    Ok(Number::Int(q - 1))
                } else {
                    Ok(Number::Int(q))
                }
            }
            _ => {
                let divisor = right.as_f64();
                if divisor == 0.0 {
                    return Err(zero_division());
                }
                Ok(Number::Float((left.as_f64() / divisor).floor()))
            }
        },
        Op::Pow => match (left, right) {
            (Number::Int(a), Number::Int(b)) if b >= 0 => u32::try_from(b)
                .ok()
                .and_then(|b| a.checked_pow(b))
                .map(Number::Int)
                .ok_or_else(overflow),
            _ => {
                let (a, b) = (left.as_f64(), right.as_f64());
                if a == 0.0 && b < 0.0 {
                    return Err(zero_division());
                }
                let value = a.powf(b);
                if value.is_nan() {
                    return Err(AgentError::Tool(format!(
                        "{} ** {} is not a real number",
                        left, right
                    )));
                }
                Ok(Number::Float(value))
            }
        },
        Op::Add | Op::Sub | Op::Mul => match (left, right) {
            (Number::Int(a), Number::Int(b)) => {
                let value = match op {
                    Op::Add => a.checked_add(b),
                    Op::Sub => a.checked_sub(b),
                    _ => a.checked_mul(b),
                };
                value.map(Number::Int).ok_or_else(overflow)
            }
            _ => {
                let (a, b) = (left.as_f64(), right.as_f64());
                Ok(Number::Float(match op {
                    Op::Add => a + b,
                    Op::Sub => a - b,
                    _ => a * b,
                }))
            }
        },
    }
}
