//! Infix tokenization and conversion to reverse-Polish order.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::core::errors::{OrchestratorError, Result};
use crate::scheduler::model::Operator;

/// Lexical unit of an infix expression
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Raw numeric text, validated when the postfix sequence is evaluated
    Number(String),
    Operator(Operator),
    LeftParen,
    RightParen,
}

/// Split infix text into tokens.
///
/// A `+` or `-` standing where an operand is expected and directly followed
/// by a digit or `.` becomes the sign of that numeric literal.
pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((position, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            c if is_number_char(c) => tokens.push(Token::Number(read_number(c, &mut chars))),
            '+' | '-' if expects_operand(&tokens) && starts_number(chars.peek()) => {
                tokens.push(Token::Number(read_number(ch, &mut chars)))
            }
            '(' => tokens.push(Token::LeftParen),
            ')' => tokens.push(Token::RightParen),
            c => match Operator::from_symbol(c) {
                Some(op) => tokens.push(Token::Operator(op)),
                None => {
                    return Err(OrchestratorError::syntax_at(
                        format!("unknown token '{}' at position {}", c, position),
                        position,
                    ))
                }
            },
        }
    }

    Ok(tokens)
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn read_number(first: char, chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut number = String::from(first);
    while let Some(&(_, next)) = chars.peek() {
        if !is_number_char(next) {
            break;
        }
        number.push(next);
        chars.next();
    }
    number
}

fn expects_operand(tokens: &[Token]) -> bool {
    matches!(
        tokens.last(),
        None | Some(Token::LeftParen) | Some(Token::Operator(_))
    )
}

fn starts_number(next: Option<&(usize, char)>) -> bool {
    next.map_or(false, |&(_, c)| is_number_char(c))
}

/// Convert infix text to postfix order with the operator-precedence stack algorithm.
///
/// `*` and `/` bind tighter than `+` and `-`; operators of equal precedence
/// associate to the left.
pub fn to_postfix(text: &str) -> Result<Vec<Token>> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(OrchestratorError::syntax("empty expression"));
    }

    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Number(_) => output.push(token),
            Token::Operator(op) => {
                while let Some(Token::Operator(top)) = stack.last() {
                    if top.precedence() >= op.precedence() {
                        output.push(Token::Operator(*top));
                        stack.pop();
                    } else {
                        break;
                    }
                }
                stack.push(Token::Operator(op));
            }
            Token::LeftParen => stack.push(Token::LeftParen),
            Token::RightParen => loop {
                match stack.pop() {
                    Some(Token::LeftParen) => break,
                    Some(other) => output.push(other),
                    None => return Err(OrchestratorError::syntax("mismatched parentheses")),
                }
            },
        }
    }

    while let Some(token) = stack.pop() {
        if token == Token::LeftParen {
            return Err(OrchestratorError::syntax("mismatched parentheses"));
        }
        output.push(token);
    }

    Ok(output)
}
