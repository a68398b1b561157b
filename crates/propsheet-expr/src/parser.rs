//! Expression parser
//!
//! A recursive descent parser for sheet expressions with proper operator precedence.

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::{ExprError, ExprResult};

/// Parse an expression string into an AST
///
/// A leading `=` is accepted and ignored.
///
/// # Example
/// ```rust
/// use propsheet_expr::parse_expression;
///
/// let ast = parse_expression("1+2").unwrap();
/// let ast = parse_expression("=MAX(width, 10)").unwrap();
/// let ast = parse_expression("IF(locked, \"Yes\", \"No\")").unwrap();
/// ```
pub fn parse_expression(text: &str) -> ExprResult<Expr> {
    let text = text.trim();
    let text = text.strip_prefix('=').unwrap_or(text);

    let mut parser = ExprParser::new(text);
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if !matches!(parser.current_token(), Token::Eof) {
        return Err(ExprError::Parse(format!(
            "Unexpected token after expression: {:?}",
            parser.current_token()
        )));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Empty,

    // Names and function identifiers
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    // Anything the scanner does not recognise
    Unknown(char),

    // End of input
    Eof,
}

/// Expression parser
struct ExprParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Option<Token>,
}

impl<'a> ExprParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: None,
        };
        parser.advance_token();
        parser
    }

    // === Token scanning ===

    fn advance_token(&mut self) {
        self.skip_whitespace();
        self.current_token = Some(self.scan_token());
    }

    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();

        let Some(c) = self.peek_char() else {
            return Token::Eof;
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        // Two-character operators
        if c == '<' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::LessEqual;
            } else if self.peek_char() == Some('>') {
                self.advance();
                return Token::NotEqual;
            }
            return Token::LessThan;
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::GreaterEqual;
            }
            return Token::GreaterThan;
        }

        // String literal
        if c == '"' {
            return self.scan_string();
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        // Identifier or keyword
        if c.is_alphabetic() || c == '_' {
            return self.scan_identifier();
        }

        self.advance();
        Token::Unknown(c)
    }

    fn scan_string(&mut self) -> Token {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if c == '"' {
                // Check for escaped quote ("")
                if self.peek_char_at(1) == Some('"') {
                    s.push('"');
                    self.advance();
                    self.advance();
                } else {
                    break;
                }
            } else {
                s.push(c);
                self.advance();
            }
        }

        // Skip closing quote
        if self.peek_char() == Some('"') {
            self.advance();
        }

        Token::String(s)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.pos];
        let num: f64 = num_str.parse().unwrap_or(0.0);
        Token::Number(num)
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;

        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.advance();
        }

        let text = &self.input[start..self.pos];

        // Keywords, unless used as a function name
        if self.peek_char() != Some('(') {
            match text.to_ascii_lowercase().as_str() {
                "true" => return Token::Boolean(true),
                "false" => return Token::Boolean(false),
                "empty" => return Token::Empty,
                _ => {}
            }
        }

        Token::Identifier(text.to_string())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        self.current_token.as_ref().unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token.take().unwrap_or(Token::Eof);
        self.advance_token();
        token
    }

    fn expect(&mut self, expected: &Token) -> ExprResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(ExprError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^
    // 6. Unary: -, +, %
    // 7. Primary: literals, names, function calls, arrays, parentheses

    fn parse_expression(&mut self) -> ExprResult<Expr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            let right = self.parse_concatenation()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_additive()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume();
            let right = self.parse_additive()?;
            left = Expr::BinaryOp {
                op: BinaryOperator::Concat,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ExprResult<Expr> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume();
            let right = self.parse_exponent()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> ExprResult<Expr> {
        let left = self.parse_unary()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume();
            let right = self.parse_exponent()?; // Right associative
            return Ok(Expr::BinaryOp {
                op: BinaryOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        // Prefix unary minus
        if matches!(self.current_token(), Token::Minus) {
            self.consume();
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        // Prefix plus (no-op)
        if matches!(self.current_token(), Token::Plus) {
            self.consume();
            return self.parse_unary();
        }

        // Parse primary, then check for postfix percent
        let mut expr = self.parse_primary()?;

        while matches!(self.current_token(), Token::Percent) {
            self.consume();
            expr = Expr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> ExprResult<Expr> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume();
                Ok(Expr::Number(n))
            }

            Token::String(s) => {
                self.consume();
                Ok(Expr::String(s))
            }

            Token::Boolean(b) => {
                self.consume();
                Ok(Expr::Boolean(b))
            }

            Token::Empty => {
                self.consume();
                Ok(Expr::Empty)
            }

            Token::LeftParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::LeftBrace => self.parse_array(),

            Token::Identifier(name) => {
                self.consume();
                // Check if it's a function call
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(Expr::Name(name))
                }
            }

            Token::Unknown(c) => Err(ExprError::Parse(format!("Unexpected character '{}'", c))),

            _ => Err(ExprError::Parse(format!(
                "Unexpected token: {:?}",
                self.current_token()
            ))),
        }
    }

    fn parse_array(&mut self) -> ExprResult<Expr> {
        self.expect(&Token::LeftBrace)?;

        let mut items = Vec::new();

        if !matches!(self.current_token(), Token::RightBrace) {
            items.push(self.parse_expression()?);

            loop {
                match self.current_token() {
                    Token::Comma => {
                        self.consume();
                        items.push(self.parse_expression()?);
                    }
                    Token::RightBrace => break,
                    _ => return Err(ExprError::Parse("Expected ',' or '}' in array".into())),
                }
            }
        }

        self.expect(&Token::RightBrace)?;
        Ok(Expr::Array(items))
    }

    fn parse_function_call(&mut self, name: String) -> ExprResult<Expr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        // Parse arguments
        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(Expr::Function {
            name: name.to_uppercase(),
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_expression("42").unwrap(), Expr::Number(42.0));
        assert_eq!(parse_expression("0.5").unwrap(), Expr::Number(0.5));
        assert_eq!(parse_expression("1e3").unwrap(), Expr::Number(1000.0));
    }

    #[test]
    fn test_parse_leading_equals() {
        assert_eq!(parse_expression("=7").unwrap(), Expr::Number(7.0));
    }

    #[test]
    fn test_parse_string() {
        let ast = parse_expression("\"Hello \"\"World\"\"\"").unwrap();
        assert_eq!(ast, Expr::String("Hello \"World\"".into()));
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_expression("true").unwrap(), Expr::Boolean(true));
        assert_eq!(parse_expression("FALSE").unwrap(), Expr::Boolean(false));
        assert_eq!(parse_expression("empty").unwrap(), Expr::Empty);
    }

    #[test]
    fn test_parse_name() {
        assert_eq!(
            parse_expression("dialog.width").unwrap(),
            Expr::name("dialog.width")
        );
        assert_eq!(parse_expression("_x1").unwrap(), Expr::name("_x1"));
    }

    #[test]
    fn test_parse_precedence() {
        let ast = parse_expression("a + b * 3").unwrap();
        if let Expr::BinaryOp { op, left, right } = ast {
            assert_eq!(op, BinaryOperator::Add);
            assert_eq!(*left, Expr::name("a"));
            assert!(matches!(
                *right,
                Expr::BinaryOp {
                    op: BinaryOperator::Multiply,
                    ..
                }
            ));
        } else {
            panic!("Expected BinaryOp");
        }
    }

    #[test]
    fn test_parse_power_right_associative() {
        let ast = parse_expression("2 ^ 3 ^ 2").unwrap();
        if let Expr::BinaryOp { op, left, right } = ast {
            assert_eq!(op, BinaryOperator::Power);
            assert_eq!(*left, Expr::Number(2.0));
            assert!(matches!(
                *right,
                Expr::BinaryOp {
                    op: BinaryOperator::Power,
                    ..
                }
            ));
        } else {
            panic!("Expected BinaryOp");
        }
    }

    #[test]
    fn test_parse_unary() {
        assert!(matches!(
            parse_expression("-x").unwrap(),
            Expr::UnaryOp {
                op: UnaryOperator::Negate,
                ..
            }
        ));
        assert!(matches!(
            parse_expression("50%").unwrap(),
            Expr::UnaryOp {
                op: UnaryOperator::Percent,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_function() {
        let ast = parse_expression("max(a, 2, b + 1)").unwrap();
        if let Expr::Function { name, args } = ast {
            assert_eq!(name, "MAX");
            assert_eq!(args.len(), 3);
        } else {
            panic!("Expected Function");
        }
    }

    #[test]
    fn test_parse_keyword_as_function_name() {
        // `true(` is a call, not a literal
        let ast = parse_expression("TRUE()").unwrap();
        assert!(matches!(ast, Expr::Function { .. }));
    }

    #[test]
    fn test_parse_array() {
        let ast = parse_expression("{1, a, \"x\"}").unwrap();
        assert_eq!(
            ast,
            Expr::Array(vec![
                Expr::Number(1.0),
                Expr::name("a"),
                Expr::String("x".into())
            ])
        );
        assert_eq!(parse_expression("{}").unwrap(), Expr::Array(vec![]));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_expression("1 +"), Err(ExprError::Parse(_))));
        assert!(matches!(parse_expression("(1"), Err(ExprError::Parse(_))));
        assert!(matches!(parse_expression("a b"), Err(ExprError::Parse(_))));
        assert!(matches!(parse_expression("a # b"), Err(ExprError::Parse(_))));
    }

    #[test]
    fn test_display_reparses() {
        for text in [
            "a + b * 3",
            "(a + b) * 3",
            "a - (b - c)",
            "2 ^ 3 ^ 2",
            "(2 ^ 3) ^ 2",
            "-(a + 1)",
            "IF(x > 1, \"big \"\"one\"\"\", {1, 2})",
        ] {
            let ast = parse_expression(text).unwrap();
            assert_eq!(ast.to_string(), text);
            assert_eq!(parse_expression(&ast.to_string()).unwrap(), ast);
        }
    }
}
