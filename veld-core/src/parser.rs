use std::sync::Arc;

use crate::{
    ast::{Bind, BinaryOp, Expr, FunctionDef, Location, UnaryOp},
    error::StaticError,
    tokenizer::{PositionedToken, Token, Tokenizer},
};

/// Parses a complete program. Trailing tokens after the top-level
/// expression are an error.
pub fn parse(source: &str, origin: &str) -> Result<Expr, StaticError> {
    let origin: Arc<str> = origin.into();
    let tokens = Tokenizer::tokenize(source, origin.clone())?;
    let mut parser = Parser::new(tokens, origin);
    let expr = parser.parse_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(_) => Err(parser.error_here("expected end of input")),
    }
}

struct Parser {
    tokens: Vec<PositionedToken>,
    position: usize,
    origin: Arc<str>,
}

impl Parser {
    fn new(tokens: Vec<PositionedToken>, origin: Arc<str>) -> Self {
        Parser {
            tokens,
            position: 0,
            origin,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<&PositionedToken> {
        let token = self.tokens.get(self.position);
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Location of the token at the cursor, or just past the last token at
    /// end of input.
    fn here(&self) -> Location {
        match self.tokens.get(self.position) {
            Some(t) => Location::new(self.origin.clone(), t.line, t.column),
            None => match self.tokens.last() {
                Some(t) => Location::new(self.origin.clone(), t.line, t.column + 1),
                None => Location::new(self.origin.clone(), 1, 1),
            },
        }
    }

    fn error_here<T: Into<String>>(&self, message: T) -> StaticError {
        StaticError::new(message, self.here())
    }

    fn describe(token: Option<&Token>) -> String {
        match token {
            None => "end of input".to_string(),
            Some(token) => format!("{:?}", token),
        }
    }

    fn expect(&mut self, expected: Token, description: &str) -> Result<(), StaticError> {
        if self.peek() == Some(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(format!(
                "expected {}, got {}",
                description,
                Self::describe(self.peek())
            )))
        }
    }

    fn accept(&mut self, token: Token) -> bool {
        if self.peek() == Some(&token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_identifier(&mut self, description: &str) -> Result<Arc<str>, StaticError> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error_here(format!(
                "expected {}, got {}",
                description,
                Self::describe(other)
            ))),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, StaticError> {
        match self.peek() {
            Some(Token::Local) => self.parse_local(),
            Some(Token::If) => self.parse_if(),
            Some(Token::Function) => self.parse_function(),
            Some(Token::ErrorKeyword) => {
                let location = self.here();
                self.advance();
                let operand = self.parse_expr()?;
                Ok(Expr::ErrorExpr {
                    operand: Box::new(operand),
                    location,
                })
            }
            _ => self.parse_binary(0),
        }
    }

    fn parse_local(&mut self) -> Result<Expr, StaticError> {
        let location = self.here();
        self.advance(); // `local`
        let mut binds: Vec<Bind> = Vec::new();
        loop {
            let bind_location = self.here();
            let name = self.expect_identifier("a binding name")?;
            self.expect(Token::Equal, "'='")?;
            let value = self.parse_expr()?;
            binds.push(Bind {
                name,
                value,
                location: bind_location,
            });
            if !self.accept(Token::Comma) {
                break;
            }
        }
        self.expect(Token::Semicolon, "';'")?;
        let body = self.parse_expr()?;
        Ok(Expr::Local {
            binds,
            body: Box::new(body),
            location,
        })
    }

    fn parse_if(&mut self) -> Result<Expr, StaticError> {
        let location = self.here();
        self.advance(); // `if`
        let cond = self.parse_expr()?;
        self.expect(Token::Then, "'then'")?;
        let then_branch = self.parse_expr()?;
        let else_branch = if self.accept(Token::Else) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(Expr::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
            location,
        })
    }

    fn parse_function(&mut self) -> Result<Expr, StaticError> {
        let location = self.here();
        self.advance(); // `function`
        self.expect(Token::LeftParen, "'('")?;
        let mut params: Vec<Arc<str>> = Vec::new();
        if self.peek() != Some(&Token::RightParen) {
            loop {
                params.push(self.expect_identifier("a parameter name")?);
                if !self.accept(Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RightParen, "')'")?;
        let body = self.parse_expr()?;
        Ok(Expr::Function(
            Arc::new(FunctionDef {
                params,
                body,
                location: location.clone(),
            }),
            location,
        ))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, StaticError> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.peek().and_then(BinaryOp::from_token) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            let location = self.here();
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                location,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, StaticError> {
        // A keyword form in operand position swallows everything to its
        // right: `a && error b` is `a && (error b)`.
        if let Some(Token::Local | Token::If | Token::Function | Token::ErrorKeyword) = self.peek()
        {
            return self.parse_expr();
        }
        if let Some(op) = self.peek().and_then(UnaryOp::from_token) {
            let location = self.here();
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                location,
            });
        }
        self.parse_postfix()
    }

    /// Calls and indexing bind tighter than any operator and chain left to
    /// right: `f(1)(2)`, `rows[0][1]`.
    fn parse_postfix(&mut self) -> Result<Expr, StaticError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::LeftParen) => {
                    let location = self.here();
                    self.advance();
                    let mut args: Vec<Expr> = Vec::new();
                    if self.peek() != Some(&Token::RightParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.accept(Token::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(Token::RightParen, "')'")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        location,
                    };
                }
                Some(Token::LeftBracket) => {
                    let location = self.here();
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(Token::RightBracket, "']'")?;
                    expr = Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                        location,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, StaticError> {
        let location = self.here();
        match self.peek() {
            Some(Token::Null) => {
                self.advance();
                Ok(Expr::Null(location))
            }
            Some(Token::True) => {
                self.advance();
                Ok(Expr::Boolean(true, location))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Expr::Boolean(false, location))
            }
            Some(Token::Number(value)) => {
                let value = *value;
                self.advance();
                Ok(Expr::Number(value, location))
            }
            Some(Token::Str(value)) => {
                let value = value.clone();
                self.advance();
                Ok(Expr::Str(value, location))
            }
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::Var(name, location))
            }
            Some(Token::LeftParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Token::RightParen, "')'")?;
                Ok(inner)
            }
            Some(Token::LeftBracket) => {
                self.advance();
                let mut elements: Vec<Expr> = Vec::new();
                if self.peek() != Some(&Token::RightBracket) {
                    loop {
                        elements.push(self.parse_expr()?);
                        if !self.accept(Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Token::RightBracket, "']'")?;
                Ok(Expr::Array(elements, location))
            }
            other => Err(self.error_here(format!(
                "expected an expression, got {}",
                Self::describe(other)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse;
    use crate::ast::{BinaryOp, Expr};

    fn parse_ok(source: &str) -> Expr {
        match parse(source, "<test>") {
            Ok(expr) => expr,
            Err(err) => panic!("expected '{}' to parse, but got: {}", source, err),
        }
    }

    fn parse_error_message(source: &str) -> String {
        match parse(source, "<test>") {
            Ok(expr) => panic!("expected '{}' to fail parsing, but got {:?}", source, expr),
            Err(err) => err.message,
        }
    }

    #[test]
    fn precedence_groups_multiplication_before_addition() {
        let Expr::Binary { op, right, .. } = parse_ok("1 + 2 * 3") else {
            panic!("expected a binary expression");
        };
        assert_eq!(op, BinaryOp::Add);
        let Expr::Binary { op: inner, .. } = *right else {
            panic!("expected the right operand to be the multiplication");
        };
        assert_eq!(inner, BinaryOp::Multiply);
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let Expr::Binary { op, left, .. } = parse_ok("1 - 2 - 3") else {
            panic!("expected a binary expression");
        };
        assert_eq!(op, BinaryOp::Subtract);
        assert!(matches!(
            *left,
            Expr::Binary {
                op: BinaryOp::Subtract,
                ..
            }
        ));
    }

    #[test]
    fn local_parses_multiple_binds() {
        let Expr::Local { binds, .. } = parse_ok("local a = 1, b = a; b") else {
            panic!("expected a local expression");
        };
        assert_eq!(binds.len(), 2);
        assert_eq!(&*binds[0].name, "a");
        assert_eq!(&*binds[1].name, "b");
    }

    #[test]
    fn if_without_else_parses() {
        let Expr::If { else_branch, .. } = parse_ok("if true then 1") else {
            panic!("expected an if expression");
        };
        assert!(else_branch.is_none());
    }

    #[test]
    fn calls_and_indexing_chain() {
        assert!(matches!(parse_ok("f(1)(2)"), Expr::Call { .. }));
        assert!(matches!(parse_ok("rows[0][1]"), Expr::Index { .. }));
        assert!(matches!(parse_ok("f(1)[0]"), Expr::Index { .. }));
    }

    #[test]
    fn function_parses_parameter_list() {
        let Expr::Function(def, _) = parse_ok("function(a, b) a + b") else {
            panic!("expected a function expression");
        };
        assert_eq!(def.params.len(), 2);
    }

    #[test]
    fn keyword_forms_parse_as_binary_operands() {
        let Expr::Binary { right, .. } = parse_ok("false && error \"x\"") else {
            panic!("expected a binary expression");
        };
        assert!(matches!(*right, Expr::ErrorExpr { .. }));
        let Expr::Binary { right, .. } = parse_ok("1 + if true then 2 else 3") else {
            panic!("expected a binary expression");
        };
        assert!(matches!(*right, Expr::If { .. }));
    }

    #[test]
    fn trailing_tokens_are_an_error() {
        assert_eq!(parse_error_message("1 1"), "expected end of input");
    }

    #[test]
    fn missing_semicolon_after_local_is_an_error() {
        assert_eq!(
            parse_error_message("local a = 1 a"),
            "expected ';', got Identifier(\"a\")"
        );
    }

    #[test]
    fn unexpected_end_of_input_reports_a_location_past_the_last_token() {
        let err = parse("1 +", "<test>").unwrap_err();
        let location = err.location.expect("error should carry a location");
        assert_eq!((location.line, location.column), (1, 4));
    }
}
