use crate::error::{ParseError, Result};
use crate::lexer::{Lexer, Token};
use crate::node::{ListOp, Node, NodeKind};
use crate::span::Span;
use std::ops::RangeInclusive;
use ziffers_core::chords::is_chord_name;

/// Roman numerals, longest first so `vii` is not read as `v`
const ROMANS: [(&str, i64); 7] = [
    ("vii", 7),
    ("iii", 3),
    ("iv", 4),
    ("vi", 6),
    ("ii", 2),
    ("v", 5),
    ("i", 1),
];

/// Largest count accepted after `!`
const MAX_REPEAT: i64 = 256;

/// Largest inversion accepted after `%`, in either direction
const MAX_INVERSION: i64 = 64;

/// Duration letters in whole notes
fn duration_letter(c: char) -> Option<f64> {
    let duration = match c {
        'm' => 8.0,
        'l' => 4.0,
        'd' => 2.0,
        'w' => 1.0,
        'h' => 0.5,
        'q' => 0.25,
        'e' => 0.125,
        's' => 0.0625,
        't' => 0.03125,
        'f' => 0.015625,
        'x' => 0.0078125,
        _ => return None,
    };
    Some(duration)
}

/// Each dot adds half of the previous addition
fn dotted(duration: f64, dots: u32) -> f64 {
    duration * (2.0 - 0.5f64.powi(dots as i32))
}

/// Parser for Ziffers notation
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    last_span: Span,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> Self {
        Parser {
            lexer: Lexer::new(source),
            last_span: Span::default(),
        }
    }

    /// Parse the whole input as one sequence
    pub fn parse(&mut self) -> Result<Vec<Node>> {
        let items = self.parse_sequence()?;
        match self.next() {
            None => Ok(items),
            Some((token, span)) => Err(ParseError::unexpected_token(
                "end of input",
                token.to_string(),
                span,
            )),
        }
    }

    /// Items up to a closing delimiter, a comma or the end of input
    fn parse_sequence(&mut self) -> Result<Vec<Node>> {
        let mut items = Vec::new();
        while let Some((token, _)) = self.peek() {
            if token.is_closing() || token == Token::Comma {
                break;
            }
            items.push(self.parse_item()?);
        }
        Ok(items)
    }

    /// A sequence followed by its closing delimiter
    fn parse_group(&mut self, open: Span, delimiter: char, close: Token) -> Result<(Vec<Node>, Span)> {
        let items = self.parse_sequence()?;
        let end = self.expect_close(open, delimiter, close)?;
        Ok((items, open.merge(end)))
    }

    fn expect_close(&mut self, open: Span, delimiter: char, close: Token) -> Result<Span> {
        match self.next() {
            Some((token, span)) if token == close => Ok(span),
            Some((token, span)) => Err(ParseError::unexpected_token(
                close.to_string(),
                token.to_string(),
                span,
            )),
            None => Err(ParseError::unclosed_delimiter(delimiter, open)),
        }
    }

    /// A primary followed by any postfix operators
    fn parse_item(&mut self) -> Result<Node> {
        let mut node = self.parse_primary()?;
        loop {
            let Some((token, op_span)) = self.peek() else {
                break;
            };
            let start = node.span;
            node = match token {
                Token::Bang => {
                    self.next();
                    let (times, span) = self.expect_count(0..=MAX_REPEAT)?;
                    Node::new(
                        NodeKind::Repeat {
                            item: Box::new(node),
                            times: times as usize,
                        },
                        start.merge(span),
                    )
                }
                t if t.is_list_operator() && is_list(&node) => {
                    self.next();
                    let op = ListOp::from_symbol(self.lexer.slice(op_span))
                        .ok_or_else(|| ParseError::invalid_atom(t.to_string(), op_span))?;
                    let open = self.expect_token(Token::LParen)?;
                    let (items, span) = self.parse_group(open, '(', Token::RParen)?;
                    Node::new(
                        NodeKind::ListOperation {
                            op,
                            left: Box::new(node),
                            right: Box::new(Node::new(NodeKind::List { items }, span)),
                        },
                        start.merge(span),
                    )
                }
                Token::Percent => {
                    self.next();
                    let (k, span) = self.expect_count(-MAX_INVERSION..=MAX_INVERSION)?;
                    with_inversion(node, k as i32, span)?
                }
                Token::At => {
                    self.next();
                    self.parse_attachment(node)?
                }
                Token::Colon => {
                    self.next();
                    self.parse_index(node)?
                }
                _ => break,
            };
        }
        Ok(node)
    }

    /// After `@`: indices for an arpeggio, or a sample name or cycle
    fn parse_attachment(&mut self, node: Node) -> Result<Node> {
        let start = node.span;
        match self.next() {
            Some((Token::LParen, open)) => {
                let (indices, span) = self.parse_group(open, '(', Token::RParen)?;
                Ok(Node::new(
                    NodeKind::Arpeggio {
                        chord: Box::new(node),
                        indices,
                    },
                    start.merge(span),
                ))
            }
            Some((Token::Word, span)) => {
                let sound = Node::new(
                    NodeKind::Sound {
                        name: self.lexer.slice(span).to_string(),
                        index: None,
                        duration: None,
                    },
                    span,
                );
                Ok(Node::new(
                    NodeKind::SoundEvent {
                        item: Box::new(node),
                        sound: Box::new(sound),
                    },
                    start.merge(span),
                ))
            }
            Some((Token::LAngle, open)) => {
                let (items, span) = self.parse_group(open, '<', Token::RAngle)?;
                let sound = Node::new(NodeKind::Cycle { items }, span);
                Ok(Node::new(
                    NodeKind::SoundEvent {
                        item: Box::new(node),
                        sound: Box::new(sound),
                    },
                    start.merge(span),
                ))
            }
            Some((token, span)) => Err(ParseError::unexpected_token(
                "arpeggio indices or sample name",
                token.to_string(),
                span,
            )),
            None => Err(ParseError::unexpected_eof("arpeggio indices or sample name")),
        }
    }

    /// After `:`: a sample index number or cycle
    fn parse_index(&mut self, node: Node) -> Result<Node> {
        let start = node.span;
        let index = match self.peek() {
            Some((Token::LAngle, open)) => {
                self.next();
                let (items, span) = self.parse_group(open, '<', Token::RAngle)?;
                Node::new(NodeKind::Cycle { items }, span)
            }
            _ => {
                let (number, span) = self.expect_number()?;
                if let NodeKind::Sound { name, duration, .. } = &node.kind {
                    return Ok(Node::new(
                        NodeKind::Sound {
                            name: name.clone(),
                            index: Some(number),
                            duration: *duration,
                        },
                        start.merge(span),
                    ));
                }
                Node::new(
                    NodeKind::Pitch {
                        degree: number,
                        add: 0.0,
                        octave: 0,
                        duration: None,
                    },
                    span,
                )
            }
        };
        let span = start.merge(index.span);
        Ok(Node::new(
            NodeKind::SoundIndex {
                item: Box::new(node),
                index: Box::new(index),
            },
            span,
        ))
    }

    fn parse_primary(&mut self) -> Result<Node> {
        let Some((token, span)) = self.next() else {
            return Err(ParseError::unexpected_eof("pitch, rest or group"));
        };
        match token {
            Token::Digits | Token::LBrace => self.parse_pitches(token, span, 0.0, None),
            Token::Sharp => {
                let mut add = 1.0;
                while let Some((Token::Sharp, next)) = self.peek() {
                    if !self.last_span.touches(next) {
                        break;
                    }
                    self.next();
                    add += 1.0;
                }
                match self.next_touching() {
                    Some((token @ (Token::Digits | Token::LBrace), next)) => self.parse_pitches(token, next, add, None),
                    _ => Err(ParseError::custom("'#' must be followed by a degree", Some(span))),
                }
            }
            Token::Caret | Token::Underscore => {
                let step = if token == Token::Caret { 1 } else { -1 };
                let mut change = step;
                while let Some((next_token, next)) = self.peek() {
                    if next_token != token || !self.last_span.touches(next) {
                        break;
                    }
                    self.next();
                    change += step;
                }
                match self.peek() {
                    Some((
                        Token::Digits | Token::LBrace | Token::Word | Token::Sharp | Token::Question,
                        next,
                    )) if self.last_span.touches(next) => {
                        let node = self.parse_primary()?;
                        let node = with_octave(node, change)?;
                        Ok(Node::new(node.kind, span.merge(node.span)))
                    }
                    _ => Ok(Node::new(NodeKind::OctaveChange { change }, span.merge(self.last_span))),
                }
            }
            Token::Word => self.parse_word(span),
            Token::Decimal(duration) => Ok(Node::new(NodeKind::DurationChange { duration }, span)),
            Token::Question => Ok(Node::new(
                NodeKind::RandomPitch {
                    min: 0,
                    max: None,
                    octave: 0,
                    duration: None,
                },
                span,
            )),
            Token::LBracket => {
                let (items, span) = self.parse_group(span, '[', Token::RBracket)?;
                Ok(Node::new(NodeKind::Subdivision { items }, span))
            }
            Token::LAngle => {
                let (items, span) = self.parse_group(span, '<', Token::RAngle)?;
                Ok(Node::new(NodeKind::Cycle { items }, span))
            }
            Token::LParen => self.parse_parens(span),
            Token::Error => Err(ParseError::invalid_atom(self.lexer.slice(span), span)),
            other => Err(ParseError::unexpected_token(
                "pitch, rest or group",
                other.to_string(),
                span,
            )),
        }
    }

    /// `( ... )` is a list; `(min,max)` a random degree in that range
    fn parse_parens(&mut self, open: Span) -> Result<Node> {
        let first = self.parse_sequence()?;
        if let Some((Token::Comma, _)) = self.peek() {
            self.next();
            let second = self.parse_sequence()?;
            let end = self.expect_close(open, '(', Token::RParen)?;
            let span = open.merge(end);
            let (Some(min), Some(max)) = (self.single_number(&first), self.single_number(&second)) else {
                return Err(ParseError::custom("random range needs two numbers", Some(span)));
            };
            return Ok(Node::new(
                NodeKind::RandomPitch {
                    min,
                    max: Some(max),
                    octave: 0,
                    duration: None,
                },
                span,
            ));
        }
        let end = self.expect_close(open, '(', Token::RParen)?;
        Ok(Node::new(NodeKind::List { items: first }, open.merge(end)))
    }

    fn single_number(&self, nodes: &[Node]) -> Option<i64> {
        match nodes {
            [node] => self.lexer.slice(node.span).parse().ok(),
            _ => None,
        }
    }

    /// A run of touching digit groups and `{..}` groups starting with `first`.
    /// Several digits make a chord; a lone brace group of several numbers is a
    /// sequence of pitches.
    fn parse_pitches(&mut self, first: Token, start: Span, add: f64, duration: Option<f64>) -> Result<Node> {
        let mut degrees: Vec<(i64, Span)> = Vec::new();
        let mut brace_groups = 0;
        let mut digit_runs = 0;
        let mut current = (first, start);
        loop {
            match current {
                (Token::Digits, span) => {
                    digit_runs += 1;
                    let text = self.lexer.slice(span);
                    if text.starts_with('-') {
                        let degree = text
                            .parse()
                            .map_err(|_| ParseError::invalid_number(text, span))?;
                        degrees.push((degree, span));
                    } else {
                        for (offset, c) in text.char_indices() {
                            let degree = c.to_digit(10).map(i64::from).unwrap_or_default();
                            let at = span.start + offset;
                            degrees.push((degree, Span::new(at, at + 1)));
                        }
                    }
                }
                (_, open) => {
                    brace_groups += 1;
                    degrees.extend(self.parse_brace_numbers(open)?);
                }
            }
            match self.peek() {
                Some((token @ (Token::Digits | Token::LBrace), next)) if self.last_span.touches(next) => {
                    if token == Token::Digits && self.lexer.slice(next).starts_with('-') {
                        break;
                    }
                    self.next();
                    current = (token, next);
                }
                _ => break,
            }
        }

        let span = start.merge(self.last_span);
        let pitch = |(degree, span): (i64, Span)| {
            Node::new(
                NodeKind::Pitch {
                    degree,
                    add,
                    octave: 0,
                    duration,
                },
                span,
            )
        };
        if degrees.len() == 1 {
            let node = pitch(degrees[0]);
            return Ok(Node::new(node.kind, span));
        }
        if brace_groups == 1 && digit_runs == 0 {
            let items = degrees.into_iter().map(pitch).collect();
            return Ok(Node::new(NodeKind::List { items }, span));
        }
        Ok(Node::new(
            NodeKind::Chord {
                pitches: degrees.into_iter().map(pitch).collect(),
                inversion: 0,
            },
            span,
        ))
    }

    /// Whole numbers up to the closing `}`
    fn parse_brace_numbers(&mut self, open: Span) -> Result<Vec<(i64, Span)>> {
        let mut numbers = Vec::new();
        loop {
            match self.next() {
                Some((Token::RBrace, _)) => break,
                Some((Token::Digits, span)) => {
                    let text = self.lexer.slice(span);
                    let number = text
                        .parse()
                        .map_err(|_| ParseError::invalid_number(text, span))?;
                    numbers.push((number, span));
                }
                Some((token, span)) => {
                    return Err(ParseError::unexpected_token("number", token.to_string(), span))
                }
                None => return Err(ParseError::unclosed_delimiter('{', open)),
            }
        }
        if numbers.is_empty() {
            return Err(ParseError::custom("empty degree group", Some(open)));
        }
        Ok(numbers)
    }

    /// Durations, rests, prefixed degrees, roman numerals, notes, named chords
    /// and sample names all lex as words
    fn parse_word(&mut self, span: Span) -> Result<Node> {
        let text = self.lexer.slice(span);
        let mut dots = 0;
        while let Some((Token::Dot, next)) = self.peek() {
            if !self.last_span.touches(next) {
                break;
            }
            self.next();
            dots += 1;
        }
        let full = span.merge(self.last_span);

        let mut chars = text.chars();
        let first = chars.next().unwrap_or_default();
        let rest = chars.as_str();
        let letter = duration_letter(first).map(|d| dotted(d, dots));

        if rest.is_empty() {
            if let Some(duration) = letter {
                return Ok(Node::new(NodeKind::DurationChange { duration }, full));
            }
        }
        if text == "r" {
            return Ok(Node::new(NodeKind::Rest { duration: None }, full));
        }
        if let (Some(duration), "r") = (letter, rest) {
            return Ok(Node::new(NodeKind::Rest { duration: Some(duration) }, full));
        }

        // Duration and accidentals in front of degrees, like `q3`, `eb24`
        let (duration, body) = match letter {
            Some(duration) if starts_degree(rest) => (Some(duration), rest),
            _ => (None, text),
        };
        if starts_degree(body) {
            let digits = body.trim_start_matches(['#', 'b']);
            let sharps = body.len() - body.trim_start_matches('#').len();
            let flats = body.len() - digits.len() - sharps;
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                let add = sharps as f64 - flats as f64;
                let offset = span.end - digits.len();
                let degrees: Vec<Node> = digits
                    .char_indices()
                    .map(|(i, c)| {
                        Node::new(
                            NodeKind::Pitch {
                                degree: c.to_digit(10).map(i64::from).unwrap_or_default(),
                                add,
                                octave: 0,
                                duration,
                            },
                            Span::new(offset + i, offset + i + 1),
                        )
                    })
                    .collect();
                return Ok(match <[Node; 1]>::try_from(degrees) {
                    Ok([node]) => Node::new(node.kind, full),
                    Err(pitches) => Node::new(NodeKind::Chord { pitches, inversion: 0 }, full),
                });
            }
        }

        if let Some(node) = self.parse_roman(text, full, duration)? {
            return Ok(node);
        }
        if let Some(node) = parse_note(text, full, duration) {
            return Ok(node);
        }
        Ok(Node::new(
            NodeKind::Sound {
                name: text.to_string(),
                index: None,
                duration: None,
            },
            full,
        ))
    }

    /// `iv`, `v7`, `imin` or `i^min`
    fn parse_roman(&mut self, text: &str, span: Span, duration: Option<f64>) -> Result<Option<Node>> {
        let Some((numeral, suffix)) = ROMANS.iter().find_map(|(roman, numeral)| {
            let suffix = text.strip_prefix(roman)?;
            (suffix.is_empty() || is_chord_name(suffix)).then_some((*numeral, suffix))
        }) else {
            return Ok(None);
        };

        let mut chord = (!suffix.is_empty()).then(|| suffix.to_string());
        let mut span = span;
        if chord.is_none() {
            if let (Some((Token::Caret, caret)), Some((Token::Word, word))) = (self.lexer.peek_nth(0), self.lexer.peek_nth(1)) {
                let name = self.lexer.slice(word);
                if span.touches(caret) && caret.touches(word) && is_chord_name(name) {
                    chord = Some(name.to_string());
                    self.next();
                    self.next();
                    span = span.merge(word);
                }
            }
        }
        Ok(Some(Node::new(
            NodeKind::Roman {
                numeral,
                chord,
                inversion: 0,
                octave: 0,
                duration,
            },
            span,
        )))
    }

    fn peek(&mut self) -> Option<(Token, Span)> {
        self.lexer.peek_token()
    }

    fn next(&mut self) -> Option<(Token, Span)> {
        let next = self.lexer.next_token();
        if let Some((_, span)) = &next {
            self.last_span = *span;
        }
        next
    }

    /// Next token only when nothing separates it from the previous one
    fn next_touching(&mut self) -> Option<(Token, Span)> {
        match self.peek() {
            Some((_, span)) if self.last_span.touches(span) => self.next(),
            _ => None,
        }
    }

    fn expect_token(&mut self, expected: Token) -> Result<Span> {
        match self.next() {
            Some((token, span)) if token == expected => Ok(span),
            Some((token, span)) => Err(ParseError::unexpected_token(
                expected.to_string(),
                token.to_string(),
                span,
            )),
            None => Err(ParseError::unexpected_eof(expected.to_string())),
        }
    }

    /// A whole number such as the count after `!`
    fn expect_number(&mut self) -> Result<(i64, Span)> {
        let span = self.expect_token(Token::Digits)?;
        let text = self.lexer.slice(span);
        let number = text
            .parse()
            .map_err(|_| ParseError::invalid_number(text, span))?;
        Ok((number, span))
    }

    /// A whole number that must fall inside `range`
    fn expect_count(&mut self, range: RangeInclusive<i64>) -> Result<(i64, Span)> {
        let (number, span) = self.expect_number()?;
        if !range.contains(&number) {
            return Err(ParseError::invalid_number(self.lexer.slice(span), span));
        }
        Ok((number, span))
    }
}

fn starts_degree(text: &str) -> bool {
    text.trim_start_matches(['#', 'b'])
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}

/// `C`, `F#`, `Eb` or a named chord on one of them such as `Cmaj` or `Bb7`
fn parse_note(text: &str, span: Span, duration: Option<f64>) -> Option<Node> {
    let first = text.chars().next()?;
    if !('A'..='G').contains(&first) {
        return None;
    }
    let after_letter = &text[1..];
    let suffix = after_letter.trim_start_matches(['#', 'b']);
    let root = &text[..text.len() - suffix.len()];
    if suffix.is_empty() {
        return Some(Node::new(
            NodeKind::Note {
                name: root.to_string(),
                octave: 0,
                duration,
            },
            span,
        ));
    }
    if is_chord_name(suffix) {
        return Some(Node::new(
            NodeKind::NamedChord {
                root: root.to_string(),
                chord: suffix.to_string(),
                inversion: 0,
                octave: 0,
                duration,
            },
            span,
        ));
    }
    None
}

fn is_list(node: &Node) -> bool {
    matches!(node.kind, NodeKind::List { .. } | NodeKind::ListOperation { .. })
}

fn with_inversion(node: Node, k: i32, end: Span) -> Result<Node> {
    let span = node.span.merge(end);
    let kind = match node.kind {
        NodeKind::Chord { pitches, .. } => NodeKind::Chord {
            pitches,
            inversion: k,
        },
        NodeKind::Roman {
            numeral,
            chord,
            octave,
            duration,
            ..
        } => NodeKind::Roman {
            numeral,
            chord,
            inversion: k,
            octave,
            duration,
        },
        NodeKind::NamedChord {
            root,
            chord,
            octave,
            duration,
            ..
        } => NodeKind::NamedChord {
            root,
            chord,
            inversion: k,
            octave,
            duration,
        },
        _ => return Err(ParseError::custom("inversion needs a chord", Some(span))),
    };
    Ok(Node::new(kind, span))
}

/// Apply an octave prefix such as `^` or `__` to a pitch-like node
fn with_octave(node: Node, change: i64) -> Result<Node> {
    let span = node.span;
    let kind = match node.kind {
        NodeKind::Pitch {
            degree,
            add,
            octave,
            duration,
        } => NodeKind::Pitch {
            degree,
            add,
            octave: octave + change,
            duration,
        },
        NodeKind::Chord { pitches, inversion } => NodeKind::Chord {
            pitches: pitches
                .into_iter()
                .map(|p| with_octave(p, change))
                .collect::<Result<_>>()?,
            inversion,
        },
        NodeKind::List { items } => NodeKind::List {
            items: items
                .into_iter()
                .map(|p| with_octave(p, change))
                .collect::<Result<_>>()?,
        },
        NodeKind::RandomPitch {
            min,
            max,
            octave,
            duration,
        } => NodeKind::RandomPitch {
            min,
            max,
            octave: octave + change,
            duration,
        },
        NodeKind::Roman {
            numeral,
            chord,
            inversion,
            octave,
            duration,
        } => NodeKind::Roman {
            numeral,
            chord,
            inversion,
            octave: octave + change,
            duration,
        },
        NodeKind::NamedChord {
            root,
            chord,
            inversion,
            octave,
            duration,
        } => NodeKind::NamedChord {
            root,
            chord,
            inversion,
            octave: octave + change,
            duration,
        },
        NodeKind::Note {
            name,
            octave,
            duration,
        } => NodeKind::Note {
            name,
            octave: octave + change,
            duration,
        },
        _ => return Err(ParseError::custom("octave prefix needs a pitch", Some(span))),
    };
    Ok(Node::new(kind, span))
}

/// Parse notation text into its node tree
pub fn parse(source: &str) -> Result<Vec<Node>> {
    let mut parser = Parser::new(source);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<NodeKind> {
        parse(source).unwrap().into_iter().map(|n| n.kind).collect()
    }

    fn pitch(degree: i64) -> NodeKind {
        NodeKind::Pitch {
            degree,
            add: 0.0,
            octave: 0,
            duration: None,
        }
    }

    #[test]
    fn test_parse_degrees() {
        assert_eq!(kinds("0 1 -2"), vec![pitch(0), pitch(1), pitch(-2)]);
    }

    #[test]
    fn test_parse_chord() {
        let nodes = parse("024").unwrap();
        assert_eq!(nodes.len(), 1);
        let NodeKind::Chord { pitches, inversion } = &nodes[0].kind else {
            panic!("expected chord, got {:?}", nodes[0].kind);
        };
        assert_eq!(*inversion, 0);
        assert_eq!(pitches.len(), 3);
        assert_eq!(pitches[2].span, Span::new(2, 3));
        assert_eq!(nodes[0].span, Span::new(0, 3));
    }

    #[test]
    fn test_parse_duration_change() {
        assert_eq!(
            kinds("e 1 0.5"),
            vec![
                NodeKind::DurationChange { duration: 0.125 },
                pitch(1),
                NodeKind::DurationChange { duration: 0.5 },
            ]
        );
        assert_eq!(kinds("q.")[0], NodeKind::DurationChange { duration: 0.375 });
    }

    #[test]
    fn test_parse_prefixed_degree() {
        assert_eq!(
            kinds("e3")[0],
            NodeKind::Pitch {
                degree: 3,
                add: 0.0,
                octave: 0,
                duration: Some(0.125),
            }
        );
        assert_eq!(
            kinds("b3")[0],
            NodeKind::Pitch {
                degree: 3,
                add: -1.0,
                octave: 0,
                duration: None,
            }
        );
        assert_eq!(
            kinds("#3")[0],
            NodeKind::Pitch {
                degree: 3,
                add: 1.0,
                octave: 0,
                duration: None,
            }
        );
    }

    #[test]
    fn test_parse_octave() {
        assert_eq!(
            kinds("^3")[0],
            NodeKind::Pitch {
                degree: 3,
                add: 0.0,
                octave: 1,
                duration: None,
            }
        );
        assert_eq!(
            kinds("_ 3"),
            vec![NodeKind::OctaveChange { change: -1 }, pitch(3)]
        );
        assert_eq!(kinds("^^")[0], NodeKind::OctaveChange { change: 2 });
    }

    #[test]
    fn test_parse_rest() {
        assert_eq!(kinds("r")[0], NodeKind::Rest { duration: None });
        assert_eq!(kinds("qr")[0], NodeKind::Rest { duration: Some(0.25) });
    }

    #[test]
    fn test_parse_roman() {
        assert_eq!(
            kinds("iv")[0],
            NodeKind::Roman {
                numeral: 4,
                chord: None,
                inversion: 0,
                octave: 0,
                duration: None,
            }
        );
        assert_eq!(kinds("i^min"), kinds("imin"));
        let NodeKind::Roman { numeral, chord, .. } = &kinds("vii7")[0] else {
            panic!("expected roman");
        };
        assert_eq!((*numeral, chord.as_deref()), (7, Some("7")));
    }

    #[test]
    fn test_parse_words() {
        assert!(matches!(kinds("C")[0], NodeKind::Note { .. }));
        assert!(matches!(kinds("Bb7")[0], NodeKind::NamedChord { ref root, .. } if root == "Bb"));
        assert!(matches!(kinds("bd")[0], NodeKind::Sound { ref name, .. } if name == "bd"));
        assert!(matches!(kinds("hh27")[0], NodeKind::Sound { .. }));
    }

    #[test]
    fn test_parse_sound_index() {
        assert_eq!(
            kinds("bd:3")[0],
            NodeKind::Sound {
                name: "bd".to_string(),
                index: Some(3),
                duration: None,
            }
        );
        assert!(matches!(kinds("1:3")[0], NodeKind::SoundIndex { .. }));
    }

    #[test]
    fn test_parse_list_operation() {
        let NodeKind::ListOperation { op, left, right } = &kinds("(1 2)+(3)")[0] else {
            panic!("expected list operation");
        };
        assert_eq!(*op, ListOp::Add);
        assert!(matches!(left.kind, NodeKind::List { ref items } if items.len() == 2));
        assert!(matches!(right.kind, NodeKind::List { ref items } if items.len() == 1));
    }

    #[test]
    fn test_parse_random_range() {
        assert_eq!(
            kinds("(1,12)")[0],
            NodeKind::RandomPitch {
                min: 1,
                max: Some(12),
                octave: 0,
                duration: None,
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("[1 2"), Err(ParseError::UnclosedDelimiter { delimiter: '[', .. })));
        assert!(matches!(parse("1 ]"), Err(ParseError::UnexpectedToken { .. })));
        assert!(matches!(parse("1%"), Err(ParseError::UnexpectedEof { .. })));
        assert!(parse("(1,2 3)").is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range_counts() {
        assert!(matches!(parse("024%2000000000"), Err(ParseError::InvalidNumber { .. })));
        assert!(matches!(parse("024%-65"), Err(ParseError::InvalidNumber { .. })));
        assert!(matches!(parse("1!100000"), Err(ParseError::InvalidNumber { .. })));
        assert!(matches!(parse("1!-2"), Err(ParseError::InvalidNumber { .. })));
        assert!(parse("024%64 024%-64 1!256 1!0").is_ok());
    }
}
