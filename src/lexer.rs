use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Eof,
    Def,
    Extern,
    Number(f64),
    Identifier(String),
    /// any other single character, operators and punctuation included
    Other(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Eof => write!(f, "end of input"),
            Token::Def => write!(f, "'def'"),
            Token::Extern => write!(f, "'extern'"),
            Token::Number(value) => write!(f, "number {}", value),
            Token::Identifier(name) => write!(f, "identifier '{}'", name),
            Token::Other(c) => write!(f, "'{}'", c.escape_debug()),
        }
    }
}

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum LexError {
    #[error("malformed number literal '{0}'")]
    MalformedNumber(String),
}

/// Hand-written character lexer with one character of lookahead.
///
/// Only the plain space character counts as whitespace; tabs and newlines
/// come back as `Token::Other`.
#[derive(Debug, Clone)]
pub struct Lexer {
    source: Vec<char>,
    position: usize,
    /// `None` once the source is exhausted
    last_char: Option<char>,
    number_value: f64,
    identifier_text: String,
}

impl std::default::Default for Lexer {
    fn default() -> Self {
        Self::new("")
    }
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let mut lexer = Self {
            source: Vec::new(),
            position: 0,
            last_char: None,
            number_value: 0.0,
            identifier_text: String::new(),
        };
        lexer.reset(source);
        lexer
    }

    /// Start over on a new program. Any buffered literal is discarded.
    pub fn reset(&mut self, source: &str) {
        self.source = source.chars().collect();
        self.position = 0;
        self.last_char = Some(' ');
        self.number_value = 0.0;
        self.identifier_text.clear();
    }

    pub fn next_char(&mut self) -> Option<char> {
        let c = self.source.get(self.position).copied();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    /// The value of the last `Token::Number`, valid until the next token.
    pub fn number_value(&self) -> f64 {
        self.number_value
    }

    /// The text of the last identifier or keyword, valid until the next token.
    pub fn identifier_text(&self) -> &str {
        &self.identifier_text
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        while self.last_char == Some(' ') {
            self.last_char = self.next_char();
        }

        match self.last_char {
            Some(c) if c.is_ascii_alphabetic() => Ok(self.lex_identifier(c)),
            Some(c) if c.is_ascii_digit() || c == '.' => self.lex_number(c),
            None => Ok(Token::Eof),
            Some(c) => {
                self.last_char = self.next_char();
                Ok(Token::Other(c))
            }
        }
    }

    fn lex_identifier(&mut self, first: char) -> Token {
        self.identifier_text.clear();
        self.identifier_text.push(first);
        loop {
            self.last_char = self.next_char();
            match self.last_char {
                Some(c) if c.is_ascii_alphanumeric() => self.identifier_text.push(c),
                _ => break,
            }
        }

        match self.identifier_text.as_str() {
            "def" => Token::Def,
            "extern" => Token::Extern,
            ident => Token::Identifier(ident.to_string()),
        }
    }

    fn lex_number(&mut self, first: char) -> Result<Token, LexError> {
        let mut text = String::new();
        let mut seen_decimal = false;
        let mut c = first;
        loop {
            seen_decimal |= c == '.';
            text.push(c);
            self.last_char = self.next_char();
            match self.last_char {
                Some('.') if seen_decimal => {
                    text.push('.');
                    return Err(LexError::MalformedNumber(text));
                }
                Some(next) if next.is_ascii_digit() || next == '.' => c = next,
                _ => break,
            }
        }

        // str::parse accepts "5." and ".5" but not a lone "."
        let value: f64 = text
            .parse()
            .map_err(|_| LexError::MalformedNumber(text.clone()))?;
        self.number_value = value;
        Ok(Token::Number(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex_all(input: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            if token == Token::Eof {
                return Ok(tokens);
            }
            tokens.push(token);
        }
    }

    #[test]
    fn lex_works() {
        let input = "def add(x y) x+1.0;";
        let tokenized = vec![
            Token::Def,
            Token::Identifier("add".to_string()),
            Token::Other('('),
            Token::Identifier("x".to_string()),
            Token::Identifier("y".to_string()),
            Token::Other(')'),
            Token::Identifier("x".to_string()),
            Token::Other('+'),
            Token::Number(1.0),
            Token::Other(';'),
        ];
        assert_eq!(lex_all(input).unwrap(), tokenized);
    }

    #[test]
    fn keywords_need_exact_match() {
        assert_eq!(
            lex_all("extern externs define def2").unwrap(),
            vec![
                Token::Extern,
                Token::Identifier("externs".to_string()),
                Token::Identifier("define".to_string()),
                Token::Identifier("def2".to_string()),
            ]
        );
    }

    #[test]
    fn only_spaces_are_skipped() {
        assert_eq!(
            lex_all("a\tb\n").unwrap(),
            vec![
                Token::Identifier("a".to_string()),
                Token::Other('\t'),
                Token::Identifier("b".to_string()),
                Token::Other('\n'),
            ]
        );
        assert!(lex_all("    ").unwrap().is_empty());
    }

    #[test]
    fn numbers_round_trip() {
        for text in &["0", "42", "3.25", "0.5", ".5", "5.", "123456.789", "007"] {
            let expected: f64 = text.parse().unwrap();
            let mut lexer = Lexer::new(text);
            assert_eq!(lexer.next_token().unwrap(), Token::Number(expected));
            assert_eq!(lexer.number_value(), expected);
            assert_eq!(format!("{}", lexer.number_value()).parse::<f64>().unwrap(), expected);
            assert_eq!(lexer.next_token().unwrap(), Token::Eof);
        }
    }

    #[test]
    fn second_decimal_point_is_malformed() {
        for text in &["1.2.3", "..", "1..", ".5.", "2 + 3.1.4"] {
            match lex_all(text) {
                Err(LexError::MalformedNumber(_)) => (),
                other => panic!("expected malformed number for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn lone_dot_is_malformed() {
        assert_eq!(
            Lexer::new(".").next_token(),
            Err(LexError::MalformedNumber(".".to_string()))
        );
    }

    #[test]
    fn lexing_resumes_after_malformed_number() {
        let mut lexer = Lexer::new("1..2 x");
        assert!(lexer.next_token().is_err());
        assert_eq!(lexer.next_token().unwrap(), Token::Number(0.2));
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Identifier("x".to_string())
        );
    }

    #[test]
    fn number_stops_at_letter() {
        assert_eq!(
            lex_all("4x").unwrap(),
            vec![Token::Number(4.0), Token::Identifier("x".to_string())]
        );
    }

    #[test]
    fn identifier_slot_tracks_last_identifier() {
        let mut lexer = Lexer::new("foo bar2");
        lexer.next_token().unwrap();
        assert_eq!(lexer.identifier_text(), "foo");
        lexer.next_token().unwrap();
        assert_eq!(lexer.identifier_text(), "bar2");
    }

    #[test]
    fn reset_starts_over() {
        let mut lexer = Lexer::new("1 2");
        assert_eq!(lexer.next_token().unwrap(), Token::Number(1.0));
        lexer.reset("x");
        assert_eq!(lexer.identifier_text(), "");
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Identifier("x".to_string())
        );
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn next_char_reports_end() {
        let mut lexer = Lexer::new("ab");
        assert_eq!(lexer.next_char(), Some('a'));
        assert_eq!(lexer.next_char(), Some('b'));
        assert_eq!(lexer.next_char(), None);
        assert_eq!(lexer.next_char(), None);
    }
}
