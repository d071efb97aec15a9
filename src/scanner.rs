use anyhow::anyhow;

use crate::ast::{Token, TokenType};

pub struct Scanner {
    source_chars: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: u32,
    col: u32,
    start_line: u32,
    start_col: u32,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            source_chars: source.chars().collect(),
            tokens: vec![],
            start: 0,
            current: 0,
            line: 1,
            col: 1,
            start_line: 1,
            start_col: 1,
        }
    }

    pub fn tokens(&self) -> &Vec<Token> {
        &self.tokens
    }

    fn advance(&mut self) -> char {
        let c = self.source_chars[self.current];
        self.current += 1;
        self.col += 1;
        c
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source_chars.len()
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source_chars[self.current]
        }
    }

    fn peek_next_i(&self, i: usize) -> char {
        if self.current + i >= self.source_chars.len() {
            '\0'
        } else {
            self.source_chars[self.current + i]
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() != expected {
            return false;
        };

        self.current += 1;
        self.col += 1;
        true
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.tokens.push(Token {
            kind: token_type,
            lexeme: self.current_source_str(),
            line: self.start_line,
            col: self.start_col,
            start: self.start,
            end: self.current,
        });
    }

    fn current_source_str(&self) -> String {
        self.source_chars[self.start..self.current].iter().collect()
    }

    fn reset(&mut self) {
        self.tokens.clear();
        self.start = 0;
        self.current = 0;
        self.col = 1;
        self.line = 1;
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.col = 1;
    }

    pub fn scan(&mut self) -> anyhow::Result<()> {
        self.reset();
        while self.current < self.source_chars.len() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_col = self.col;
            self.scan_token()?;
        }
        self.tokens.push(Token {
            kind: TokenType::Eof,
            lexeme: String::from("eof"),
            line: self.line,
            col: self.col,
            start: self.source_chars.len(),
            end: self.source_chars.len(),
        });

        Ok(())
    }

    fn is_identifier_start(c: char) -> bool {
        c.is_alphabetic() || c == '_'
    }

    fn is_identifier_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '$' || c == '#'
    }

    // Quotes are escaped by doubling them: 'it''s'
    fn match_string(&mut self, delimiter: char) -> anyhow::Result<()> {
        let mut value = String::new();
        loop {
            let peek_char = self.peek();
            if peek_char == '\0' {
                return Err(anyhow!(self.error_str("Found unterminated string")));
            }
            if peek_char == delimiter {
                self.advance();
                if self.peek() == delimiter {
                    self.advance();
                    value.push(delimiter);
                    continue;
                }
                break;
            }
            if peek_char == '\n' {
                self.advance();
                self.new_line();
                value.push(peek_char);
                continue;
            }
            value.push(self.advance());
        }
        self.add_token(TokenType::String(value));
        Ok(())
    }

    fn match_number(&mut self) -> anyhow::Result<()> {
        if self.source_chars[self.start] == '0' && (self.peek() == 'x' || self.peek() == 'X') {
            self.advance();
            while self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            self.add_token(TokenType::Number(self.current_source_str()));
            return Ok(());
        }

        let mut found_dot = self.source_chars[self.start] == '.';
        let mut found_e = false;
        loop {
            let peek_char = self.peek();

            if peek_char == '.' {
                if found_dot || found_e {
                    return Err(anyhow!(self.error_str("Found invalid number")));
                }
                found_dot = true;
                self.advance();
            } else if peek_char == 'e' || peek_char == 'E' {
                if found_e {
                    return Err(anyhow!(self.error_str("Found invalid number")));
                }
                found_e = true;
                let peek_next_char = self.peek_next_i(1);
                if peek_next_char == '+' || peek_next_char == '-' {
                    self.advance();
                    if !(self.peek_next_i(1).is_ascii_digit()) {
                        return Err(anyhow!(self.error_str("Found invalid number")));
                    }
                    self.advance();
                } else if peek_next_char.is_ascii_digit() {
                    self.advance();
                } else {
                    return Err(anyhow!(self.error_str("Found invalid number")));
                }
            } else if peek_char.is_ascii_digit() {
                self.advance();
            } else {
                self.add_token(TokenType::Number(self.current_source_str()));
                break;
            }
        }

        Ok(())
    }

    fn match_variable(&mut self) -> anyhow::Result<()> {
        // @@global variables
        self.match_char('@');
        if !Self::is_identifier_char(self.peek()) {
            return Err(anyhow!(self.error_str("Found empty variable name")));
        }
        while Self::is_identifier_char(self.peek()) {
            self.advance();
        }
        self.add_token(TokenType::Variable(self.current_source_str()));
        Ok(())
    }

    fn match_bracketed_identifier(&mut self) -> anyhow::Result<()> {
        let mut value = String::new();
        loop {
            let peek_char = self.peek();
            if peek_char == '\0' || peek_char == '\n' {
                return Err(anyhow!(
                    self.error_str("Found unterminated quoted identifier")
                ));
            }
            self.advance();
            if peek_char == ']' {
                if self.peek() == ']' {
                    self.advance();
                    value.push(']');
                    continue;
                }
                break;
            }
            value.push(peek_char);
        }
        if value.is_empty() {
            return Err(anyhow!(self.error_str("Found empty quoted identifier")));
        }
        self.add_token(TokenType::QuotedIdentifier(value));
        Ok(())
    }

    fn match_block_comment(&mut self) -> anyhow::Result<()> {
        // Block comments nest in T-SQL
        let mut depth = 1;
        while depth > 0 {
            let peek_char = self.peek();
            if peek_char == '\0' {
                return Err(anyhow!(self.error_str("Found unterminated comment")));
            }
            if peek_char == '/' && self.peek_next_i(1) == '*' {
                self.advance();
                self.advance();
                depth += 1;
                continue;
            }
            if peek_char == '*' && self.peek_next_i(1) == '/' {
                self.advance();
                self.advance();
                depth -= 1;
                continue;
            }
            self.advance();
            if peek_char == '\n' {
                self.new_line();
            }
        }
        Ok(())
    }

    fn match_keyword_or_identifier(&mut self) {
        while Self::is_identifier_char(self.peek()) {
            self.advance();
        }
        let identifier = self.current_source_str();

        match identifier.to_lowercase().as_str() {
            "all" => self.add_token(TokenType::All),
            "and" => self.add_token(TokenType::And),
            "as" => self.add_token(TokenType::As),
            "asc" => self.add_token(TokenType::Asc),
            "begin" => self.add_token(TokenType::Begin),
            "between" => self.add_token(TokenType::Between),
            "break" => self.add_token(TokenType::Break),
            "by" => self.add_token(TokenType::By),
            "case" => self.add_token(TokenType::Case),
            "close" => self.add_token(TokenType::Close),
            "commit" => self.add_token(TokenType::Commit),
            "continue" => self.add_token(TokenType::Continue),
            "create" => self.add_token(TokenType::Create),
            "cross" => self.add_token(TokenType::Cross),
            "deallocate" => self.add_token(TokenType::Deallocate),
            "declare" => self.add_token(TokenType::Declare),
            "default" => self.add_token(TokenType::Default),
            "delete" => self.add_token(TokenType::Delete),
            "desc" => self.add_token(TokenType::Desc),
            "distinct" => self.add_token(TokenType::Distinct),
            "drop" => self.add_token(TokenType::Drop),
            "else" => self.add_token(TokenType::Else),
            "end" => self.add_token(TokenType::End),
            "exec" | "execute" => self.add_token(TokenType::Execute),
            "exists" => self.add_token(TokenType::Exists),
            "fetch" => self.add_token(TokenType::Fetch),
            "for" => self.add_token(TokenType::For),
            "from" => self.add_token(TokenType::From),
            "full" => self.add_token(TokenType::Full),
            "group" => self.add_token(TokenType::Group),
            "having" => self.add_token(TokenType::Having),
            "if" => self.add_token(TokenType::If),
            "in" => self.add_token(TokenType::In),
            "inner" => self.add_token(TokenType::Inner),
            "insert" => self.add_token(TokenType::Insert),
            "into" => self.add_token(TokenType::Into),
            "is" => self.add_token(TokenType::Is),
            "join" => self.add_token(TokenType::Join),
            "left" => self.add_token(TokenType::Left),
            "like" => self.add_token(TokenType::Like),
            "not" => self.add_token(TokenType::Not),
            "null" => self.add_token(TokenType::Null),
            "on" => self.add_token(TokenType::On),
            "open" => self.add_token(TokenType::Open),
            "or" => self.add_token(TokenType::Or),
            "order" => self.add_token(TokenType::Order),
            "outer" => self.add_token(TokenType::Outer),
            "print" => self.add_token(TokenType::Print),
            "proc" | "procedure" => self.add_token(TokenType::Procedure),
            "raiserror" => self.add_token(TokenType::Raiserror),
            "return" => self.add_token(TokenType::Return),
            "right" => self.add_token(TokenType::Right),
            "rollback" => self.add_token(TokenType::Rollback),
            "select" => self.add_token(TokenType::Select),
            "set" => self.add_token(TokenType::Set),
            "table" => self.add_token(TokenType::Table),
            "then" => self.add_token(TokenType::Then),
            "truncate" => self.add_token(TokenType::Truncate),
            "union" => self.add_token(TokenType::Union),
            "update" => self.add_token(TokenType::Update),
            "values" => self.add_token(TokenType::Values),
            "when" => self.add_token(TokenType::When),
            "where" => self.add_token(TokenType::Where),
            "while" => self.add_token(TokenType::While),
            _ => self.add_token(TokenType::Identifier(identifier)),
        }
    }

    fn scan_token(&mut self) -> anyhow::Result<()> {
        let curr_char = self.advance();
        match curr_char {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            ',' => self.add_token(TokenType::Comma),
            ':' => self.add_token(TokenType::Colon),
            ';' => self.add_token(TokenType::Semicolon),
            '.' => {
                if self.peek().is_ascii_digit() {
                    self.match_number()?;
                } else {
                    self.add_token(TokenType::Dot);
                }
            }
            '+' => self.add_token(TokenType::Plus),
            '%' => self.add_token(TokenType::Percent),
            '~' => self.add_token(TokenType::BitwiseNot),
            '&' => self.add_token(TokenType::BitwiseAnd),
            '^' => self.add_token(TokenType::BitwiseXor),
            '|' => {
                if self.match_char('|') {
                    self.add_token(TokenType::ConcatOperator);
                } else {
                    self.add_token(TokenType::BitwiseOr);
                }
            }
            '*' => {
                // Sybase outer join operator
                if self.match_char('=') {
                    self.add_token(TokenType::StarEqual);
                } else {
                    self.add_token(TokenType::Star);
                }
            }
            '=' => {
                if self.match_char('*') {
                    self.add_token(TokenType::EqualStar);
                } else {
                    self.add_token(TokenType::Equal);
                }
            }
            '/' => {
                if self.match_char('*') {
                    self.match_block_comment()?;
                } else {
                    self.add_token(TokenType::Slash)
                }
            }
            '-' => {
                if self.match_char('-') {
                    loop {
                        let peek_char = self.peek();
                        if peek_char == '\n' || peek_char == '\0' {
                            break;
                        }
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Minus)
                }
            }
            '<' => {
                if self.match_char('>') {
                    self.add_token(TokenType::NotEqual);
                } else if self.match_char('=') {
                    self.add_token(TokenType::LessEqual);
                } else {
                    self.add_token(TokenType::Less);
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenType::GreaterEqual);
                } else {
                    self.add_token(TokenType::Greater);
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.add_token(TokenType::BangEqual);
                } else if self.match_char('<') {
                    self.add_token(TokenType::NotLess);
                } else if self.match_char('>') {
                    self.add_token(TokenType::NotGreater);
                } else {
                    return Err(anyhow!(self.error_str("Found unexpected character: !")));
                }
            }
            '#' => {
                // Temporary table marker (`##` for a global one), the name follows without whitespace
                self.match_char('#');
                if !Self::is_identifier_start(self.peek()) {
                    return Err(anyhow!(
                        self.error_str("Expected temporary table name after `#`")
                    ));
                }
                self.add_token(TokenType::Hash);
            }
            '@' => self.match_variable()?,
            '[' => self.match_bracketed_identifier()?,
            '\n' => {
                self.new_line();
            }
            '\r' | ' ' | '\t' => {}

            // strings
            c if c == '\'' || c == '"' => {
                self.match_string(c)?;
            }

            // numeric
            c if c.is_ascii_digit() => {
                self.match_number()?;
            }

            // Keywords and identifiers
            c if Self::is_identifier_start(c) => {
                self.match_keyword_or_identifier();
            }

            _ => {
                return Err(anyhow!(self.error_str(&format!(
                    "Found unexpected character while scanning: {}",
                    curr_char
                ))));
            }
        }
        Ok(())
    }

    fn error_str(&self, error: &str) -> String {
        format!(
            "[line: {}, col: {}] Scanner error: {}",
            self.line, self.col, error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_kinds(sql: &str) -> Vec<TokenType> {
        let mut scanner = Scanner::new(sql);
        scanner.scan().unwrap();
        scanner.tokens().iter().map(|tok| tok.kind.clone()).collect()
    }

    #[test]
    fn test_temp_marker_is_a_separate_token() {
        assert_eq!(
            scan_kinds("from #Orders"),
            vec![
                TokenType::From,
                TokenType::Hash,
                TokenType::Identifier("Orders".to_owned()),
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn test_global_temp_marker() {
        let mut scanner = Scanner::new("from ##Shared");
        scanner.scan().unwrap();
        let tokens = scanner.tokens();
        assert_eq!(tokens[1].kind, TokenType::Hash);
        assert_eq!(tokens[1].lexeme, "##");
        assert_eq!(tokens[2].kind, TokenType::Identifier("Shared".to_owned()));
        assert!(Scanner::new("select * from ## x").scan().is_err());
    }

    #[test]
    fn test_variables_and_outer_join_operators() {
        assert_eq!(
            scan_kinds("@id *= @@rowcount =* x"),
            vec![
                TokenType::Variable("@id".to_owned()),
                TokenType::StarEqual,
                TokenType::Variable("@@rowcount".to_owned()),
                TokenType::EqualStar,
                TokenType::Identifier("x".to_owned()),
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn test_strings_brackets_and_comments() {
        assert_eq!(
            scan_kinds("'it''s' /* outer /* inner */ still */ [Order Details] -- trailing"),
            vec![
                TokenType::String("it's".to_owned()),
                TokenType::QuotedIdentifier("Order Details".to_owned()),
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn test_token_offsets_cover_lexeme() {
        let sql = "select  name\n  from t";
        let mut scanner = Scanner::new(sql);
        scanner.scan().unwrap();
        let chars: Vec<char> = sql.chars().collect();
        for tok in scanner.tokens().iter().filter(|t| t.kind != TokenType::Eof) {
            let text: String = chars[tok.start..tok.end].iter().collect();
            assert_eq!(text, tok.lexeme);
        }
        let from = &scanner.tokens()[2];
        assert_eq!((from.line, from.col), (2, 3));
    }

    #[test]
    fn test_scanner_errors() {
        for sql in ["select 'abc", "/* open", "select # x", "select [x", "select !"] {
            let mut scanner = Scanner::new(sql);
            assert!(scanner.scan().is_err(), "{}", sql);
        }
    }
}
