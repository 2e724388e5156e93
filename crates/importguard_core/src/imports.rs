//! Import extraction from Go source files.
//!
//! Only the file header is scanned: `package`, then any number of `import`
//! declarations. Scanning stops at the first other top-level token.

use std::iter::Peekable;
use std::str::Chars;

/// One imported package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Import path, without quotes.
    pub path: String,

    /// Local name (`f`, `.`, `_`) if one was given.
    pub alias: Option<String>,

    /// 1-based line of the import path.
    pub line: usize,
}

#[derive(Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Dot,
    LParen,
    RParen,
    Semicolon,
    Other,
    Eof,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(&c) = self.chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some('/') => {
                            while let Some(c) = self.chars.peek() {
                                if *c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.bump();
                            let mut prev = '\0';
                            while let Some(c) = self.bump() {
                                if prev == '*' && c == '/' {
                                    break;
                                }
                                prev = c;
                            }
                        }
                        _ => return,
                    }
                }
                _ => return,
            }
        }
    }

    /// Returns the next token and the line it starts on.
    fn next_token(&mut self) -> (Token, usize) {
        self.skip_trivia();
        let line = self.line;

        let Some(c) = self.bump() else {
            return (Token::Eof, line);
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            ';' => Token::Semicolon,
            '.' => Token::Dot,
            '"' => Token::Str(self.interpreted_string()),
            '`' => Token::Str(self.raw_string()),
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::from(c);
                while let Some(&c) = self.chars.peek() {
                    if !(c.is_alphanumeric() || c == '_') {
                        break;
                    }
                    ident.push(c);
                    self.bump();
                }
                Token::Ident(ident)
            }
            _ => Token::Other,
        };

        (token, line)
    }

    fn interpreted_string(&mut self) -> String {
        let mut value = String::new();
        while let Some(c) = self.bump() {
            match c {
                '"' | '\n' => break,
                '\\' => {
                    if let Some(escaped) = self.bump() {
                        value.push(escaped);
                    }
                }
                c => value.push(c),
            }
        }
        value
    }

    fn raw_string(&mut self) -> String {
        let mut value = String::new();
        while let Some(c) = self.bump() {
            if c == '`' {
                break;
            }
            value.push(c);
        }
        value
    }
}

/// Extracts the imports declared in a Go source file, in source order.
pub fn extract_imports(source: &str) -> Vec<Import> {
    let mut lexer = Lexer::new(source);
    let mut imports = Vec::new();

    loop {
        match lexer.next_token().0 {
            Token::Ident(keyword) if keyword == "package" => {
                lexer.next_token();
            }
            Token::Ident(keyword) if keyword == "import" => {
                if !parse_import_decl(&mut lexer, &mut imports) {
                    break;
                }
            }
            Token::Semicolon => {}
            _ => break,
        }
    }

    imports
}

/// Parses the body of an `import` declaration. Returns false at end of input.
fn parse_import_decl(lexer: &mut Lexer<'_>, imports: &mut Vec<Import>) -> bool {
    let (token, line) = lexer.next_token();
    if token != Token::LParen {
        return parse_import_spec(lexer, token, line, imports);
    }

    loop {
        let (token, line) = lexer.next_token();
        match token {
            Token::RParen => return true,
            Token::Semicolon => {}
            Token::Eof => return false,
            token => {
                if !parse_import_spec(lexer, token, line, imports) {
                    return false;
                }
            }
        }
    }
}

fn parse_import_spec(
    lexer: &mut Lexer<'_>,
    first: Token,
    line: usize,
    imports: &mut Vec<Import>,
) -> bool {
    let alias = match first {
        Token::Str(path) => {
            imports.push(Import {
                path,
                alias: None,
                line,
            });
            return true;
        }
        Token::Ident(name) => name,
        Token::Dot => ".".to_string(),
        Token::Eof => return false,
        _ => return true,
    };

    match lexer.next_token() {
        (Token::Str(path), line) => {
            imports.push(Import {
                path,
                alias: Some(alias),
                line,
            });
            true
        }
        (Token::Eof, _) => false,
        _ => true,
    }
}
