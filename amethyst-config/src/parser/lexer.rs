//! Line lexer for Amethyst configuration files
//!
//! The language is line oriented, so each line is scanned on its own by a
//! small state machine:
//!
//! - `Name`: accumulating the directive or block name
//! - `Args`: name frozen, accumulating whitespace-separated arguments
//! - `Quoted`: inside a single or double quoted span
//! - `Closed`: a block tag ended with `>`; only whitespace or a comment may follow
//!
//! Alongside the state the lexer tracks whether the line is a plain
//! directive, a block-open tag (`<Name ...>`) or a block-close tag (`</Name>`).
//! Columns are 1-based and count characters, not bytes.

use std::fmt;

/// Classified content of one source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Empty, whitespace or comment only
    Blank,
    Directive {
        name: String,
        args: Vec<String>,
        col: usize,
    },
    Open {
        name: String,
        args: Vec<String>,
        col: usize,
    },
    Close {
        name: String,
        col: usize,
        /// Column of the terminating `>`
        end: usize,
    },
}

/// Lexing failure for a single line
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{col}: {message}")]
pub struct LexError {
    pub col: usize,
    pub message: String,
}

impl LexError {
    fn new(col: usize, message: impl Into<String>) -> Self {
        Self {
            col,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Single,
    Double,
}

impl Quote {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '\'' => Some(Quote::Single),
            '"' => Some(Quote::Double),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    None,
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Name,
    Args,
    Quoted(Quote),
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Name => write!(f, "name"),
            State::Args => write!(f, "arguments"),
            State::Quoted(q) => write!(f, "quoted ({})", q.as_char()),
            State::Closed => write!(f, "closed tag"),
        }
    }
}

struct LineLexer {
    state: State,
    tag: Tag,
    name: String,
    args: Vec<String>,
    arg: String,
    /// Current argument was quoted, so keep it even when empty
    quoted: bool,
    start: Option<usize>,
    end: usize,
}

impl LineLexer {
    fn new() -> Self {
        Self {
            state: State::Name,
            tag: Tag::None,
            name: String::new(),
            args: Vec::new(),
            arg: String::new(),
            quoted: false,
            start: None,
            end: 0,
        }
    }

    fn mark(&mut self, col: usize) {
        self.start.get_or_insert(col);
    }

    fn push_arg(&mut self) {
        if !self.arg.is_empty() || self.quoted {
            self.args.push(std::mem::take(&mut self.arg));
        }
        self.quoted = false;
    }

    fn close_tag(&mut self, col: usize) -> Result<(), LexError> {
        if self.name.is_empty() {
            return Err(LexError::new(col, "missing block name"));
        }
        self.push_arg();
        self.end = col;
        self.state = State::Closed;
        Ok(())
    }

    fn name_char(&mut self, ch: char, col: usize) -> Result<(), LexError> {
        match ch {
            ' ' | '\t' => {
                if !self.name.is_empty() {
                    self.state = State::Args;
                }
            }
            '<' if self.name.is_empty() => {
                self.mark(col);
                self.tag = Tag::Open;
            }
            '/' if self.tag == Tag::Open && self.name.is_empty() => self.tag = Tag::Close,
            '/' if self.tag != Tag::None => {
                return Err(LexError::new(col, "use of token '/' after start of block name"));
            }
            '>' if self.tag != Tag::None => self.close_tag(col)?,
            '>' if self.name.is_empty() => {
                return Err(LexError::new(col, "directive must start with a letter"));
            }
            '"' | '\'' => return Err(LexError::new(col, "quotation in directive name")),
            '\\' => {
                return Err(LexError::new(col, "backslashes aren't part of directive names"));
            }
            _ => {
                self.mark(col);
                self.name.push(ch);
            }
        }
        Ok(())
    }

    fn arg_char(&mut self, ch: char, col: usize) -> Result<(), LexError> {
        match ch {
            ' ' | '\t' => self.push_arg(),
            '>' if self.tag != Tag::None => self.close_tag(col)?,
            _ => match Quote::from_char(ch) {
                Some(q) => {
                    self.state = State::Quoted(q);
                    self.quoted = true;
                }
                None => self.arg.push(ch),
            },
        }
        Ok(())
    }

    fn finish(mut self, len: usize) -> Result<Line, LexError> {
        match self.state {
            State::Quoted(_) => return Err(LexError::new(len, "unclosed quotes")),
            State::Closed => {}
            _ if self.tag != Tag::None => {
                return Err(LexError::new(len.max(1), "unterminated block tag"));
            }
            _ => {}
        }
        if self.name.is_empty() {
            return Ok(Line::Blank);
        }
        self.push_arg();

        let col = self.start.unwrap_or(1);
        Ok(match self.tag {
            Tag::None => Line::Directive {
                name: self.name,
                args: self.args,
                col,
            },
            Tag::Open => Line::Open {
                name: self.name,
                args: self.args,
                col,
            },
            Tag::Close => Line::Close {
                name: self.name,
                col,
                end: self.end,
            },
        })
    }
}

/// Lex one line (without its terminator)
pub fn lex_line(text: &str) -> Result<Line, LexError> {
    let chars: Vec<char> = text.chars().collect();
    let mut lx = LineLexer::new();

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        let col = i + 1;

        match lx.state {
            State::Closed => match ch {
                ' ' | '\t' => {}
                '#' => break,
                _ => return Err(LexError::new(col, "nothing can come after a block segment")),
            },
            State::Name | State::Args if ch == '#' => break,
            State::Name => lx.name_char(ch, col)?,
            State::Args => lx.arg_char(ch, col)?,
            State::Quoted(q) if ch == q.as_char() => {
                lx.state = State::Args;
                let next = chars.get(i + 1).copied();
                let separated = matches!(next, None | Some(' ' | '\t'));
                if lx.tag == Tag::None && !separated {
                    return Err(LexError::new(col, "quotation error"));
                }
            }
            State::Quoted(_) if ch == '\\' => {
                i += 1;
                match chars.get(i).copied() {
                    Some(escaped @ ('"' | '\'')) => lx.arg.push(escaped),
                    Some(other) => {
                        lx.arg.push('\\');
                        lx.arg.push(other);
                    }
                    None => lx.arg.push('\\'),
                }
            }
            State::Quoted(_) => lx.arg.push(ch),
        }
        i += 1;
    }

    tracing::trace!("line lexed, final state: {}", lx.state);
    lx.finish(chars.len())
}
