//! # SQL Lexer
//!
//! Single-pass scanner over one statement line. Keywords are matched
//! case-insensitively through a compile-time perfect hash map; identifiers
//! keep their original spelling. String literals use double quotes and
//! have no escape sequences; the dialect treats everything between the
//! quotes as raw value bytes.
//!
//! The lexer does not fail: unknown bytes become [`Token::Illegal`] and
//! surface as parse errors with a position attached.

use phf::phf_map;

use super::token::{Keyword, Token};

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "CREATE" => Keyword::Create,
    "TABLE" => Keyword::Table,
    "INDEX" => Keyword::Index,
    "ON" => Keyword::On,
    "INSERT" => Keyword::Insert,
    "INTO" => Keyword::Into,
    "VALUES" => Keyword::Values,
    "SELECT" => Keyword::Select,
    "FROM" => Keyword::From,
    "WHERE" => Keyword::Where,
    "AND" => Keyword::And,
    "UPDATE" => Keyword::Update,
    "DELETE" => Keyword::Delete,
    "SET" => Keyword::Set,
};

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    /// Byte position of the next unread character, for error reporting.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let word = std::str::from_utf8(&self.input[start..self.pos])
            .expect("identifier bytes are ASCII");

        match KEYWORDS.get(word.to_ascii_uppercase().as_str()) {
            Some(keyword) => Token::Keyword(*keyword),
            None => Token::Ident(word.to_string()),
        }
    }

    fn read_string(&mut self) -> Token {
        self.pos += 1; // opening quote
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'"' {
                let s = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                self.pos += 1; // closing quote
                return Token::Str(s);
            }
            self.pos += 1;
        }
        Token::Illegal('"') // unterminated literal
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let Some(b) = self.peek() else {
            return Token::Eof;
        };

        match b {
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'*' => self.single(Token::Asterisk),
            b'=' => self.single(Token::Equals),
            b'"' => self.read_string(),
            b if b.is_ascii_alphabetic() || b == b'_' => self.read_ident(),
            other => self.single(Token::Illegal(other as char)),
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    /// Drains the input into a token list ending with `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize()
    }

    #[test]
    fn create_table_statement_tokenizes() {
        let tokens = lex("CREATE TABLE dogs (name varchar, breed varchar);");
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Create),
                Token::Keyword(Keyword::Table),
                Token::Ident("dogs".to_string()),
                Token::LParen,
                Token::Ident("name".to_string()),
                Token::Ident("varchar".to_string()),
                Token::Comma,
                Token::Ident("breed".to_string()),
                Token::Ident("varchar".to_string()),
                Token::RParen,
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let tokens = lex("select * from dogs where breed = \"cane corso\";");
        assert_eq!(tokens[0], Token::Keyword(Keyword::Select));
        assert_eq!(tokens[1], Token::Asterisk);
        assert_eq!(tokens[2], Token::Keyword(Keyword::From));
        assert_eq!(tokens[4], Token::Keyword(Keyword::Where));
        assert_eq!(tokens[6], Token::Equals);
        assert_eq!(tokens[7], Token::Str("cane corso".to_string()));
    }

    #[test]
    fn string_literal_keeps_inner_spaces() {
        let tokens = lex("\"cane corso\"");
        assert_eq!(tokens[0], Token::Str("cane corso".to_string()));
    }

    #[test]
    fn empty_string_literal_is_valid() {
        let tokens = lex("\"\"");
        assert_eq!(tokens[0], Token::Str(String::new()));
    }

    #[test]
    fn unterminated_string_is_illegal() {
        let tokens = lex("\"oops");
        assert_eq!(tokens[0], Token::Illegal('"'));
    }

    #[test]
    fn identifiers_allow_underscores_and_digits() {
        let tokens = lex("tbl_2 col_name_9");
        assert_eq!(tokens[0], Token::Ident("tbl_2".to_string()));
        assert_eq!(tokens[1], Token::Ident("col_name_9".to_string()));
    }

    #[test]
    fn punctuation_is_rejected_as_illegal() {
        let tokens = lex("naughty!");
        assert_eq!(tokens[0], Token::Ident("naughty".to_string()));
        assert_eq!(tokens[1], Token::Illegal('!'));
    }
}
