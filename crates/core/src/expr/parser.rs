//! Recursive-descent parser for template expressions.

use super::ast::{Expr, NumOp};
use super::error::ExprError;
use super::lexer::{check_alphabet, Lexer, Token};

/// Parses raw expression text into an untyped syntax tree.
///
/// The character allowlist is checked first, then the token stream is parsed
/// with ordinary arithmetic precedence (`* /` over `+ -`).
pub(super) fn parse(input: &str) -> Result<Expr, ExprError> {
    check_alphabet(input)?;
    let mut parser = Parser::new(input)?;
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, ExprError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<(), ExprError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), ExprError> {
        if &self.current == expected {
            self.advance()
        } else {
            Err(ExprError::Parse {
                message: format!("expected {what}, found {:?}", self.current),
            })
        }
    }

    fn expect_end(&mut self) -> Result<(), ExprError> {
        if self.current == Token::End {
            Ok(())
        } else {
            Err(ExprError::Parse {
                message: format!("unexpected trailing input at {:?}", self.current),
            })
        }
    }

    /// expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.term()?;
        loop {
            let op = match self.current {
                Token::Plus => NumOp::Add,
                Token::Minus => NumOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.current {
                Token::Star => NumOp::Mul,
                Token::Slash => NumOp::Div,
                _ => break,
            };
            self.advance()?;
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// unary := '-' unary | primary
    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.current == Token::Minus {
            self.advance()?;
            let operand = self.unary()?;
            Ok(Expr::Neg(Box::new(operand)))
        } else {
            self.primary()
        }
    }

    /// primary := number | field | ident | ident '(' args ')' | '(' expression ')'
    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.current.clone() {
            Token::Number(value) => {
                self.advance()?;
                Ok(Expr::Number(value))
            }
            Token::Field(name) => {
                self.advance()?;
                Ok(Expr::Field(name))
            }
            Token::Ident(name) => {
                self.advance()?;
                if self.current == Token::LeftParen {
                    let args = self.arguments()?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Literal(name))
                }
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.expression()?;
                self.expect(&Token::RightParen, "closing parenthesis")?;
                Ok(expr)
            }
            other => Err(ExprError::Parse {
                message: format!("unexpected token {other:?}"),
            }),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        self.expect(&Token::LeftParen, "'('")?;
        let mut args = Vec::new();
        if self.current != Token::RightParen {
            loop {
                args.push(self.expression()?);
                if self.current == Token::Comma {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RightParen, "closing parenthesis")?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_precedence_binds_multiplication_tighter() {
        let expr = parse("1 + 2 * 3").unwrap();
        let Expr::Binary {
            op: NumOp::Add,
            left,
            right,
        } = expr
        else {
            panic!("expected addition at the root, got {expr:?}");
        };
        assert_eq!(*left, Expr::Number(dec!(1)));
        assert!(matches!(*right, Expr::Binary { op: NumOp::Mul, .. }));
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse("(1 + 2) * 3").unwrap();
        let Expr::Binary {
            op: NumOp::Mul,
            left,
            ..
        } = expr
        else {
            panic!("expected multiplication at the root, got {expr:?}");
        };
        assert!(matches!(*left, Expr::Binary { op: NumOp::Add, .. }));
    }

    #[test]
    fn test_unary_minus_binds_tighter_than_multiplication() {
        let expr = parse("-2 * 3").unwrap();
        let Expr::Binary {
            op: NumOp::Mul,
            left,
            ..
        } = expr
        else {
            panic!("expected multiplication at the root, got {expr:?}");
        };
        assert_eq!(*left, Expr::Neg(Box::new(Expr::Number(dec!(2)))));
    }

    #[test]
    fn test_call_with_field_and_literal() {
        let expr = parse("eq(:channel, AGENCY)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                name: "eq".to_string(),
                args: vec![
                    Expr::Field("channel".to_string()),
                    Expr::Literal("AGENCY".to_string()),
                ],
            }
        );
    }

    #[test]
    fn test_nested_calls() {
        let expr = parse("max(abs(:gross_amount), 1)").unwrap();
        let Expr::Call { name, args } = expr else {
            panic!("expected a call at the root");
        };
        assert_eq!(name, "max");
        assert_eq!(args.len(), 2);
        assert!(matches!(&args[0], Expr::Call { name, .. } if name == "abs"));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(parse(""), Err(ExprError::Parse { .. })));
        assert!(matches!(parse("   "), Err(ExprError::Parse { .. })));
    }

    #[test]
    fn test_trailing_input_rejected() {
        assert!(matches!(parse("1 2"), Err(ExprError::Parse { .. })));
        assert!(matches!(parse("(1 + 2))"), Err(ExprError::Parse { .. })));
    }

    #[test]
    fn test_unbalanced_parenthesis_rejected() {
        assert!(matches!(parse("(1 + 2"), Err(ExprError::Parse { .. })));
    }

    #[test]
    fn test_alphabet_checked_before_parsing() {
        assert!(matches!(
            parse(":gross_amount > 5"),
            Err(ExprError::IllegalCharacter { ch: '>', .. })
        ));
    }
}
