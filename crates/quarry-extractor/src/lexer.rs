//! String-aware lexer for bracket and quote accounting
//!
//! A three-state machine (`Normal`, `InString`, `Escaped`). Structural
//! characters only count in `Normal`; a backslash inside a string consumes the
//! next character whatever it is.

/// Lexer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexState {
    /// Outside any string literal
    #[default]
    Normal,

    /// Inside a string literal
    InString,

    /// Inside a string literal, right after a backslash
    Escaped,
}

/// Classification of one character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// `{ } [ ] , :` outside a string
    Structural(char),

    /// A quote that opens a string
    StringOpen,

    /// A quote that closes a string
    StringClose,

    /// Anything inside a string, including escapes
    StringContent,

    /// Whitespace outside a string
    Whitespace,

    /// Any other character outside a string (numbers, literals, prose)
    Other,
}

/// Character-at-a-time lexer
#[derive(Debug, Clone, Copy, Default)]
pub struct Lexer {
    state: LexState,
}

impl Lexer {
    /// Create a lexer in the `Normal` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> LexState {
        self.state
    }

    /// Consume one character
    pub fn step(&mut self, c: char) -> CharClass {
        match self.state {
            LexState::Normal => match c {
                '"' => {
                    self.state = LexState::InString;
                    CharClass::StringOpen
                }
                '{' | '}' | '[' | ']' | ',' | ':' => CharClass::Structural(c),
                c if c.is_whitespace() => CharClass::Whitespace,
                _ => CharClass::Other,
            },
            LexState::InString => match c {
                '\\' => {
                    self.state = LexState::Escaped;
                    CharClass::StringContent
                }
                '"' => {
                    self.state = LexState::Normal;
                    CharClass::StringClose
                }
                _ => CharClass::StringContent,
            },
            LexState::Escaped => {
                self.state = LexState::InString;
                CharClass::StringContent
            }
        }
    }
}

/// Closing character for an opener
pub fn closer_for(open: char) -> Option<char> {
    match open {
        '{' => Some('}'),
        '[' => Some(']'),
        _ => None,
    }
}

/// The last string literal seen by [`scan`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringSpan {
    /// Byte offset of the opening quote
    pub start: usize,

    /// Byte offset just past the closing quote (None while unterminated)
    pub end: Option<usize>,

    /// Last non-whitespace structural or literal character before the string
    pub preceded_by: Option<char>,

    /// Innermost expected closer when the string opened (`}` = inside an object)
    pub context: Option<char>,
}

impl StringSpan {
    /// Whether the string sits where an object key belongs
    pub fn in_key_position(&self) -> bool {
        self.context == Some('}') && matches!(self.preceded_by, Some('{') | Some(','))
    }
}

/// Nesting summary of a whole text
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Nesting {
    /// Lexer state at end of input
    pub state: LexState,

    /// `{` seen outside strings
    pub open_braces: usize,

    /// `}` seen outside strings
    pub close_braces: usize,

    /// `[` seen outside strings
    pub open_brackets: usize,

    /// `]` seen outside strings
    pub close_brackets: usize,

    /// Expected closers for structures still open, innermost last
    pub pending_closers: Vec<char>,

    /// The last string literal encountered
    pub last_string: Option<StringSpan>,
}

impl Nesting {
    /// Whether more braces or brackets were opened than closed
    pub fn has_unclosed(&self) -> bool {
        self.open_braces > self.close_braces || self.open_brackets > self.close_brackets
    }
}

/// Scan `text` and summarize its nesting
///
/// Closers that do not match the innermost open structure are counted but do
/// not pop the stack.
///
/// # Examples
///
/// ```
/// use quarry_extractor::lexer::{scan, LexState};
///
/// let nesting = scan(r#"{"a": ["x]", 1"#);
/// assert_eq!(nesting.state, LexState::Normal);
/// assert_eq!(nesting.pending_closers, vec!['}', ']']);
/// ```
pub fn scan(text: &str) -> Nesting {
    let mut lexer = Lexer::new();
    let mut nesting = Nesting::default();
    let mut preceded_by: Option<char> = None;

    for (idx, c) in text.char_indices() {
        match lexer.step(c) {
            CharClass::Structural(s) => {
                match s {
                    '{' | '[' => {
                        if s == '{' {
                            nesting.open_braces += 1;
                        } else {
                            nesting.open_brackets += 1;
                        }
                        if let Some(closer) = closer_for(s) {
                            nesting.pending_closers.push(closer);
                        }
                    }
                    '}' | ']' => {
                        if s == '}' {
                            nesting.close_braces += 1;
                        } else {
                            nesting.close_brackets += 1;
                        }
                        if nesting.pending_closers.last() == Some(&s) {
                            nesting.pending_closers.pop();
                        }
                    }
                    _ => {}
                }
                preceded_by = Some(s);
            }
            CharClass::StringOpen => {
                nesting.last_string = Some(StringSpan {
                    start: idx,
                    end: None,
                    preceded_by,
                    context: nesting.pending_closers.last().copied(),
                });
            }
            CharClass::StringClose => {
                if let Some(span) = nesting.last_string.as_mut() {
                    span.end = Some(idx + c.len_utf8());
                }
                preceded_by = Some('"');
            }
            CharClass::Other => preceded_by = Some(c),
            CharClass::StringContent | CharClass::Whitespace => {}
        }
    }

    nesting.state = lexer.state();
    nesting
}

/// Find the balanced region that starts at byte offset `start`
///
/// `text[start..]` must begin with `open`. Depth counts only `open`/`close`
/// outside string literals. Returns the byte range when depth returns to
/// zero, or None if the region never closes.
pub fn balanced_region(text: &str, start: usize, open: char, close: char) -> Option<(usize, usize)> {
    let tail = text.get(start..)?;
    if !tail.starts_with(open) {
        return None;
    }

    let mut lexer = Lexer::new();
    let mut depth: usize = 0;

    for (offset, c) in tail.char_indices() {
        if let CharClass::Structural(s) = lexer.step(c) {
            if s == open {
                depth += 1;
            } else if s == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some((start, start + offset + c.len_utf8()));
                }
            }
        }
    }

    None
}
