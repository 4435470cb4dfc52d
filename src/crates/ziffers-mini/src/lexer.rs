use crate::span::Span;
use logos::Logos;
use std::collections::VecDeque;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Decimal numbers are duration changes
    #[regex(r"[0-9]+\.[0-9]+", parse_decimal, priority = 10)]
    Decimal(f64),

    // Digit runs; a run of several digits is a chord
    #[regex(r"-?[0-9]+")]
    Digits,

    // Durations, rests, roman numerals, note names, chords and samples
    #[regex(r"[a-zA-Z][a-zA-Z0-9_#]*")]
    Word,

    // Delimiters
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    // Modifiers
    #[token("^")]
    Caret,
    #[token("_")]
    Underscore,
    #[token("#")]
    Sharp,
    #[token("?")]
    Question,
    #[token(",")]
    Comma,
    #[token("!")]
    Bang,
    #[token(":")]
    Colon,
    #[token("@")]
    At,
    #[token(".")]
    Dot,

    // List operators
    #[token("%")]
    Percent,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    Error,
}

fn parse_decimal(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

impl Token {
    pub fn is_closing(&self) -> bool {
        matches!(
            self,
            Token::RBracket | Token::RParen | Token::RAngle | Token::RBrace
        )
    }

    pub fn is_list_operator(&self) -> bool {
        matches!(
            self,
            Token::Plus | Token::Minus | Token::Star | Token::Slash | Token::Percent
        )
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Decimal(n) => write!(f, "{}", n),
            Token::Digits => write!(f, "digits"),
            Token::Word => write!(f, "word"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LAngle => write!(f, "<"),
            Token::RAngle => write!(f, ">"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Caret => write!(f, "^"),
            Token::Underscore => write!(f, "_"),
            Token::Sharp => write!(f, "#"),
            Token::Question => write!(f, "?"),
            Token::Comma => write!(f, ","),
            Token::Bang => write!(f, "!"),
            Token::Colon => write!(f, ":"),
            Token::At => write!(f, "@"),
            Token::Dot => write!(f, "."),
            Token::Percent => write!(f, "%"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Error => write!(f, "error"),
        }
    }
}

/// Lexer wrapper with position tracking and arbitrary lookahead
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    lookahead: VecDeque<(Token, Span)>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Lexer {
            inner: Token::lexer(source),
            lookahead: VecDeque::new(),
        }
    }

    fn fill(&mut self, n: usize) {
        while self.lookahead.len() <= n {
            let Some(token) = self.inner.next() else {
                return;
            };
            let span = Span::from(self.inner.span());
            self.lookahead.push_back((token.unwrap_or(Token::Error), span));
        }
    }

    pub fn next_token(&mut self) -> Option<(Token, Span)> {
        self.fill(0);
        self.lookahead.pop_front()
    }

    pub fn peek_token(&mut self) -> Option<(Token, Span)> {
        self.peek_nth(0)
    }

    /// Token `n` positions ahead of the next one
    pub fn peek_nth(&mut self, n: usize) -> Option<(Token, Span)> {
        self.fill(n);
        self.lookahead.get(n).cloned()
    }

    pub fn source(&self) -> &'source str {
        self.inner.source()
    }

    pub fn slice(&self, span: Span) -> &'source str {
        &self.source()[span.to_range()]
    }
}
