//! # Recursive Descent Parser
//!
//! One statement per invocation, dispatched on the leading keyword:
//!
//! ```text
//! CREATE TABLE <name> ( <col> <type> [, ...] ) ;
//! CREATE INDEX ON <table> ( <col> [, ...] ) ;
//! INSERT INTO <table> [( <col> [, ...] )] VALUES ( <"str"> [, ...] ) ;
//! SELECT * FROM <table> [WHERE <col> = <"str"> [AND ...]] ;
//! UPDATE <table> ... ;          (stub)
//! DELETE FROM <table> ... ;     (stub)
//! ```
//!
//! Identifiers are validated here: at most 255 bytes, letters, digits and
//! underscores only (the lexer already guarantees the character set). A
//! column-qualified INSERT must pair every column with a value; the
//! mismatch error names both counts.

use eyre::{bail, ensure, Result};

use super::ast::{
    CreateIndexStatement, CreateTableStatement, InsertStatement, Predicate, SelectStatement,
    Statement, Value,
};
use super::lexer::Lexer;
use super::token::{Keyword, Token};
use crate::config::MAX_IDENT_LEN;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self {
            tokens: Lexer::new(input).tokenize(),
            pos: 0,
        }
    }

    fn cur(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.cur().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        match self.advance() {
            Token::Keyword(k) if k == keyword => Ok(()),
            other => bail!("expected {:?}, found {}", keyword, other),
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        let found = self.advance();
        ensure!(found == token, "expected {}, found {}", token, found);
        Ok(())
    }

    fn ident(&mut self) -> Result<String> {
        match self.advance() {
            Token::Ident(name) => {
                ensure!(
                    name.len() <= MAX_IDENT_LEN,
                    "identifier longer than {} characters: {}",
                    MAX_IDENT_LEN,
                    name
                );
                Ok(name)
            }
            other => bail!("expected identifier, found {}", other),
        }
    }

    fn string_literal(&mut self) -> Result<String> {
        match self.advance() {
            Token::Str(s) => Ok(s),
            other => bail!("expected string literal, found {}", other),
        }
    }

    /// Parses the single statement on this line, consuming the
    /// terminating semicolon.
    pub fn parse_statement(&mut self) -> Result<Statement> {
        let statement = match self.advance() {
            Token::Keyword(Keyword::Create) => self.parse_create()?,
            Token::Keyword(Keyword::Insert) => self.parse_insert()?,
            Token::Keyword(Keyword::Select) => self.parse_select()?,
            Token::Keyword(Keyword::Update) => self.parse_update_stub()?,
            Token::Keyword(Keyword::Delete) => self.parse_delete_stub()?,
            other => bail!("expected a statement, found {}", other),
        };

        self.expect(Token::Semicolon)?;
        ensure!(
            *self.cur() == Token::Eof,
            "unexpected input after ';': {}",
            self.cur()
        );
        Ok(statement)
    }

    fn parse_create(&mut self) -> Result<Statement> {
        match self.advance() {
            Token::Keyword(Keyword::Table) => self.parse_create_table(),
            Token::Keyword(Keyword::Index) => self.parse_create_index(),
            other => bail!("expected TABLE or INDEX after CREATE, found {}", other),
        }
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        let name = self.ident()?;
        self.expect(Token::LParen)?;

        let mut columns = Vec::new();
        loop {
            let col = self.ident()?;
            let col_type = self.ident()?;
            columns.push((col, col_type));
            match self.advance() {
                Token::Comma => continue,
                Token::RParen => break,
                other => bail!("expected ',' or ')' in column list, found {}", other),
            }
        }

        Ok(Statement::CreateTable(CreateTableStatement { name, columns }))
    }

    fn parse_create_index(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::On)?;
        let table = self.ident()?;
        let columns = self.ident_list()?;
        ensure!(!columns.is_empty(), "CREATE INDEX needs at least one column");
        Ok(Statement::CreateIndex(CreateIndexStatement { table, columns }))
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Into)?;
        let table = self.ident()?;

        let columns = if *self.cur() == Token::LParen {
            Some(self.ident_list()?)
        } else {
            None
        };

        self.expect_keyword(Keyword::Values)?;
        self.expect(Token::LParen)?;

        let mut values = Vec::new();
        loop {
            values.push(Value::Str(self.string_literal()?));
            match self.advance() {
                Token::Comma => continue,
                Token::RParen => break,
                other => bail!("expected ',' or ')' in values list, found {}", other),
            }
        }

        if let Some(cols) = &columns {
            ensure!(
                cols.len() == values.len(),
                "column count {} does not match value count {}",
                cols.len(),
                values.len()
            );
        }

        Ok(Statement::Insert(InsertStatement {
            table,
            columns,
            values,
        }))
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.expect(Token::Asterisk)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.ident()?;

        let mut predicates = Vec::new();
        if *self.cur() == Token::Keyword(Keyword::Where) {
            self.advance();
            loop {
                let column = self.ident()?;
                self.expect(Token::Equals)?;
                let value = self.string_literal()?;
                predicates.push(Predicate { column, value });
                if *self.cur() == Token::Keyword(Keyword::And) {
                    self.advance();
                    continue;
                }
                break;
            }
        }

        Ok(Statement::Select(SelectStatement { table, predicates }))
    }

    fn parse_update_stub(&mut self) -> Result<Statement> {
        let table = self.ident()?;
        self.skip_to_semicolon();
        Ok(Statement::Update { table })
    }

    fn parse_delete_stub(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::From)?;
        let table = self.ident()?;
        self.skip_to_semicolon();
        Ok(Statement::Delete { table })
    }

    /// The stubs accept any tail; only the terminator matters.
    fn skip_to_semicolon(&mut self) {
        while !matches!(self.cur(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
    }

    fn ident_list(&mut self) -> Result<Vec<String>> {
        self.expect(Token::LParen)?;
        let mut idents = Vec::new();
        loop {
            idents.push(self.ident()?);
            match self.advance() {
                Token::Comma => continue,
                Token::RParen => break,
                other => bail!("expected ',' or ')' in list, found {}", other),
            }
        }
        Ok(idents)
    }
}
