use std::collections::HashMap;

use crate::ast::{ASTNode, Expression, Function, Prototype};
use crate::lexer::{LexError, Lexer, Token};

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum ParserError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unknown token {0} when expecting an expression")]
    UnexpectedToken(Token),
    #[error("expected ')' to close parenthesis, found {0}")]
    UnmatchedParen(Token),
    #[error("expected ')' or ',' in argument list, found {0}")]
    ExpectedCommaOrParen(Token),
    #[error("expected function name in prototype, found {0}")]
    ExpectedFunctionName(Token),
    #[error("expected '(' in prototype, found {0}")]
    ExpectedOpenParen(Token),
    #[error("expected ')' in prototype, found {0}")]
    ExpectedCloseParen(Token),
    #[error("expected {0}, found {1}")]
    ExpectedKeyword(&'static str, Token),
}

pub type PartialParseResult = Result<Expression, ParserError>;

/// Single-token-lookahead recursive descent parser.
///
/// Binary operators are handled by precedence climbing over
/// `operator_precedence`; operators missing from the table (and `Eof`) have
/// precedence -1 and end an expression.
#[derive(Debug, Clone)]
pub struct Parser {
    pub operator_precedence: HashMap<char, i32>,
    lexer: Lexer,
    current_token: Token,
}

impl std::default::Default for Parser {
    fn default() -> Self {
        let mut operator_precedence = HashMap::new();
        operator_precedence.insert('*', 40);
        operator_precedence.insert('+', 20);
        operator_precedence.insert('-', 20);
        Self {
            operator_precedence,
            lexer: Lexer::default(),
            current_token: Token::Eof,
        }
    }
}

impl Parser {
    /// Point the parser at a new program. Call `advance` to load the first token.
    pub fn reset(&mut self, source: &str) {
        self.lexer.reset(source);
        self.current_token = Token::Eof;
    }

    pub fn current_token(&self) -> &Token {
        &self.current_token
    }

    /// Pull the next token into the lookahead buffer. On a lexical error the
    /// buffer keeps its previous token.
    pub fn advance(&mut self) -> Result<&Token, ParserError> {
        self.current_token = self.lexer.next_token()?;
        Ok(&self.current_token)
    }

    fn is_other(&self, c: char) -> bool {
        self.current_token == Token::Other(c)
    }

    /// numberexpr ::= number
    fn parse_number(&mut self, value: f64) -> PartialParseResult {
        self.advance()?;
        Ok(Expression::Number(value))
    }

    /// parenexpr ::= '(' expression ')'
    pub fn parse_paren_expr(&mut self) -> PartialParseResult {
        self.advance()?;
        let expr = self.parse_expression()?;
        if !self.is_other(')') {
            return Err(ParserError::UnmatchedParen(self.current_token.clone()));
        }
        self.advance()?;
        Ok(expr)
    }

    /// identifierexpr
    ///   ::= identifier
    ///   ::= identifier '(' [expression {',' expression}] ')'
    pub fn parse_identifier_expr(&mut self) -> PartialParseResult {
        let name = match &self.current_token {
            Token::Identifier(name) => name.clone(),
            tok => return Err(ParserError::UnexpectedToken(tok.clone())),
        };
        self.advance()?;

        if !self.is_other('(') {
            return Ok(Expression::Variable(name));
        }
        self.advance()?;

        let mut args = Vec::new();
        if !self.is_other(')') {
            loop {
                args.push(self.parse_expression()?);

                if self.is_other(')') {
                    break;
                }
                if !self.is_other(',') {
                    return Err(ParserError::ExpectedCommaOrParen(
                        self.current_token.clone(),
                    ));
                }
                self.advance()?;
            }
        }
        self.advance()?;

        Ok(Expression::Call(name, args))
    }

    pub fn parse_primary(&mut self) -> PartialParseResult {
        match self.current_token {
            Token::Identifier(_) => self.parse_identifier_expr(),
            Token::Number(value) => self.parse_number(value),
            Token::Other('(') => self.parse_paren_expr(),
            ref tok => Err(ParserError::UnexpectedToken(tok.clone())),
        }
    }

    pub fn get_precedence(&self) -> i32 {
        match self.current_token {
            Token::Other(op) => self.operator_precedence.get(&op).copied().unwrap_or(-1),
            _ => -1,
        }
    }

    /// binoprhs ::= { binop primary }
    pub fn parse_bin_op_rhs(&mut self, min_precedence: i32, lhs: Expression) -> PartialParseResult {
        let mut result = lhs;

        loop {
            let precedence = self.get_precedence();
            if precedence < min_precedence {
                return Ok(result);
            }
            let operator = match self.current_token {
                Token::Other(op) => op,
                ref tok => return Err(ParserError::UnexpectedToken(tok.clone())),
            };
            self.advance()?;

            let mut rhs = self.parse_primary()?;

            // let a tighter operator after rhs take it as its lhs first
            if precedence < self.get_precedence() {
                rhs = self.parse_bin_op_rhs(precedence + 1, rhs)?;
            }

            result = Expression::binary(operator, result, rhs);
        }
    }

    pub fn parse_expression(&mut self) -> PartialParseResult {
        let lhs = self.parse_primary()?;
        self.parse_bin_op_rhs(0, lhs)
    }

    /// prototype ::= identifier '(' {identifier} ')'
    ///
    /// Repeated parameter names are left for the backend to reject.
    pub fn parse_prototype(&mut self) -> Result<Prototype, ParserError> {
        let name = match &self.current_token {
            Token::Identifier(name) => name.clone(),
            tok => return Err(ParserError::ExpectedFunctionName(tok.clone())),
        };
        self.advance()?;

        if !self.is_other('(') {
            return Err(ParserError::ExpectedOpenParen(self.current_token.clone()));
        }

        let mut args = Vec::new();
        while let Token::Identifier(arg) = self.advance()? {
            args.push(arg.clone());
        }

        if !self.is_other(')') {
            return Err(ParserError::ExpectedCloseParen(self.current_token.clone()));
        }
        self.advance()?;

        Ok(Prototype { name, args })
    }

    /// definition ::= 'def' prototype expression
    pub fn parse_definition(&mut self) -> Result<Function, ParserError> {
        if self.current_token != Token::Def {
            return Err(ParserError::ExpectedKeyword(
                "'def'",
                self.current_token.clone(),
            ));
        }
        self.advance()?;
        let prototype = self.parse_prototype()?;
        let body = self.parse_expression()?;
        Ok(Function { prototype, body })
    }

    /// external ::= 'extern' prototype
    pub fn parse_extern(&mut self) -> Result<Prototype, ParserError> {
        if self.current_token != Token::Extern {
            return Err(ParserError::ExpectedKeyword(
                "'extern'",
                self.current_token.clone(),
            ));
        }
        self.advance()?;
        self.parse_prototype()
    }

    /// toplevelexpr ::= expression, wrapped in an anonymous function
    pub fn parse_top_level_expr(&mut self) -> Result<Function, ParserError> {
        let body = self.parse_expression()?;
        Ok(Function {
            prototype: Prototype::anonymous(),
            body,
        })
    }

    /// Parse a whole program, stopping at the first error.
    pub fn parse_str(&mut self, input: &str) -> Result<Vec<ASTNode>, ParserError> {
        self.reset(input);
        self.advance()?;

        let mut ast = Vec::new();
        loop {
            let node = match self.current_token {
                Token::Eof => break,
                Token::Other(';') => {
                    self.advance()?;
                    continue;
                }
                Token::Def => ASTNode::Function(self.parse_definition()?),
                Token::Extern => ASTNode::Extern(self.parse_extern()?),
                _ => ASTNode::Function(self.parse_top_level_expr()?),
            };
            ast.push(node);
        }

        Ok(ast)
    }
}
