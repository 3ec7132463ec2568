use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

use crate::ast::ASTNode;
use crate::backend::{Backend, CodegenError};
use crate::lexer::Token;
use crate::parser::{Parser, ParserError};

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum DriverError {
    #[error("syntax error: {0}")]
    Parse(#[from] ParserError),
    #[error("codegen error: {0}")]
    Codegen(#[from] CodegenError),
}

/// Outcome of one top-level construct.
#[derive(Debug, PartialEq, Clone)]
pub enum Event<T> {
    Definition(T),
    Extern(T),
    TopLevel(T),
    Failed(DriverError),
}

lazy_static! {
    static ref IGNORE_RE: Regex = Regex::new(r"(?m)#.*$").unwrap();
}

/// Strip `#` comments through the end of each line.
pub fn preprocess(input: &str) -> Cow<'_, str> {
    IGNORE_RE.replace_all(input, "")
}

#[derive(Debug, Clone, Copy)]
enum Construct {
    Definition,
    Extern,
    TopLevel,
}

/// Feeds programs through the parser and hands every completed construct to
/// the backend.
pub struct Driver<B> {
    parser: Parser,
    backend: B,
}

impl<B: Backend> Driver<B> {
    pub fn new(backend: B) -> Self {
        Self {
            parser: Parser::default(),
            backend,
        }
    }

    /// Run a multi-line program: comments are stripped and each line is run
    /// on its own.
    pub fn run_program(&mut self, source: &str) -> Vec<Event<B::Output>> {
        let source = preprocess(source);
        let mut events = Vec::new();
        for line in source.lines() {
            events.extend(self.run_line(line));
        }
        events
    }

    /// top ::= definition | external | expression | ';'
    pub fn run_line(&mut self, line: &str) -> Vec<Event<B::Output>> {
        let mut events = Vec::new();
        self.parser.reset(line);
        self.skip_token(&mut events);

        loop {
            let construct = match self.parser.current_token() {
                Token::Eof => break,
                Token::Other(';') => {
                    self.skip_token(&mut events);
                    continue;
                }
                Token::Def => Construct::Definition,
                Token::Extern => Construct::Extern,
                _ => Construct::TopLevel,
            };

            match self.handle(construct) {
                Ok(event) => events.push(event),
                Err(err) => {
                    events.push(Event::Failed(err));
                    self.skip_token(&mut events);
                }
            }
        }

        events
    }

    fn handle(&mut self, construct: Construct) -> Result<Event<B::Output>, DriverError> {
        let event = match construct {
            Construct::Definition => {
                let func = self.parser.parse_definition()?;
                Event::Definition(self.backend.generate(ASTNode::Function(func))?)
            }
            Construct::Extern => {
                let proto = self.parser.parse_extern()?;
                Event::Extern(self.backend.generate(ASTNode::Extern(proto))?)
            }
            Construct::TopLevel => {
                let func = self.parser.parse_top_level_expr()?;
                Event::TopLevel(self.backend.generate(ASTNode::Function(func))?)
            }
        };
        Ok(event)
    }

    // A lexical error still consumes input, so this always terminates.
    fn skip_token(&mut self, events: &mut Vec<Event<B::Output>>) {
        while let Err(err) = self.parser.advance() {
            events.push(Event::Failed(err.into()));
        }
    }
}
