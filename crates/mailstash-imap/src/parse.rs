//! Parsing for the subset of IMAP server responses the client provokes.
//!
//! The input to [`parse`] is one logical response as produced by
//! [`crate::framed::FramedStream::read_response`]: a line with any literal
//! payloads already inlined. Only the grammar reachable from LOGIN, EXAMINE,
//! FETCH and LOGOUT is handled; unrecognized untagged responses are reported
//! as [`Response::Ignored`] rather than errors, since servers are free to
//! volunteer extra status.

use crate::{Error, Result};

/// Server completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command succeeded.
    Ok,
    /// Command failed.
    No,
    /// Command was malformed or invalid in this state.
    Bad,
    /// Server is closing the connection.
    Bye,
    /// Greeting for a pre-authenticated connection.
    PreAuth,
}

impl Status {
    fn from_atom(atom: &str) -> Option<Self> {
        if atom.eq_ignore_ascii_case("OK") {
            Some(Self::Ok)
        } else if atom.eq_ignore_ascii_case("NO") {
            Some(Self::No)
        } else if atom.eq_ignore_ascii_case("BAD") {
            Some(Self::Bad)
        } else if atom.eq_ignore_ascii_case("BYE") {
            Some(Self::Bye)
        } else if atom.eq_ignore_ascii_case("PREAUTH") {
            Some(Self::PreAuth)
        } else {
            None
        }
    }
}

/// A mailbox address from an ENVELOPE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// Display name, if any.
    pub name: Option<String>,
    /// Source route (obsolete, carried through unused).
    pub adl: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain part.
    pub host: Option<String>,
}

impl Address {
    /// Renders the address as `Name <local@host>`, or whichever parts exist.
    #[must_use]
    pub fn display(&self) -> String {
        let email = match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            (Some(m), None) => Some(m.clone()),
            _ => None,
        };
        match (&self.name, email) {
            (Some(n), Some(e)) if !n.is_empty() => format!("{n} <{e}>"),
            (_, Some(e)) => e,
            (Some(n), None) => n.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Message envelope as returned by `FETCH (ENVELOPE)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Date header, verbatim.
    pub date: Option<String>,
    /// Subject header, verbatim.
    pub subject: Option<String>,
    /// From addresses.
    pub from: Vec<Address>,
    /// Sender addresses.
    pub sender: Vec<Address>,
    /// Reply-To addresses.
    pub reply_to: Vec<Address>,
    /// To addresses.
    pub to: Vec<Address>,
    /// Cc addresses.
    pub cc: Vec<Address>,
    /// Bcc addresses.
    pub bcc: Vec<Address>,
    /// In-Reply-To header.
    pub in_reply_to: Option<String>,
    /// Message-ID header, the mailstash dedup key.
    pub message_id: Option<String>,
}

/// One message's worth of FETCH data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRecord {
    /// Message sequence number in the mailbox.
    pub seq: u32,
    /// Message UID, when requested.
    pub uid: Option<u32>,
    /// Envelope, when requested.
    pub envelope: Option<Envelope>,
    /// Raw `BODY[...]` payload, when requested.
    pub body: Option<Vec<u8>>,
}

/// A parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged command completion.
    Tagged {
        /// Command tag being completed.
        tag: String,
        /// Completion status.
        status: Status,
        /// Human-readable remainder of the line.
        text: String,
    },
    /// Untagged `* <n> EXISTS` message count.
    Exists(u32),
    /// Untagged `* <n> FETCH (...)` data.
    Fetch(Box<FetchRecord>),
    /// Untagged OK/NO/BAD/BYE/PREAUTH status, e.g. the greeting.
    ServerStatus {
        /// Status of the untagged line.
        status: Status,
        /// Human-readable remainder of the line.
        text: String,
    },
    /// Anything this client has no use for (CAPABILITY, FLAGS, RECENT, ...).
    Ignored,
}

/// Parses one logical server response.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the response violates the grammar subset
/// this client understands.
pub fn parse(input: &[u8]) -> Result<Response> {
    let mut lexer = Lexer::new(input);

    let first = lexer
        .next_token()?
        .ok_or_else(|| Error::Parse("empty response".into()))?;
    let Token::Atom(first) = first else {
        return Err(Error::Parse("response must start with a tag or *".into()));
    };

    if first == "*" {
        return parse_untagged(&mut lexer);
    }

    let tag = first.to_string();
    let status_atom = lexer.expect_atom()?;
    let status = Status::from_atom(&status_atom)
        .ok_or_else(|| Error::Parse(format!("unknown status {status_atom:?}")))?;
    Ok(Response::Tagged {
        tag,
        status,
        text: lexer.rest_of_line(),
    })
}

fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
    let word = lexer.expect_atom()?;

    if let Ok(n) = word.parse::<u32>() {
        let kind = lexer.expect_atom()?;
        if kind.eq_ignore_ascii_case("EXISTS") {
            return Ok(Response::Exists(n));
        }
        if kind.eq_ignore_ascii_case("FETCH") {
            return parse_fetch(lexer, n).map(|r| Response::Fetch(Box::new(r)));
        }
        // RECENT, EXPUNGE and friends.
        return Ok(Response::Ignored);
    }

    Status::from_atom(&word).map_or(Ok(Response::Ignored), |status| {
        Ok(Response::ServerStatus {
            status,
            text: lexer.rest_of_line(),
        })
    })
}

fn parse_fetch(lexer: &mut Lexer<'_>, seq: u32) -> Result<FetchRecord> {
    lexer.expect(Token::LParen)?;

    let mut record = FetchRecord {
        seq,
        ..FetchRecord::default()
    };

    loop {
        let token = lexer.require()?;
        let key = match token {
            Token::RParen => return Ok(record),
            Token::Atom(a) => a.to_string(),
            other => {
                return Err(Error::Parse(format!(
                    "expected fetch item name, got {other:?}"
                )));
            }
        };

        if key.eq_ignore_ascii_case("UID") {
            let atom = lexer.expect_atom()?;
            let uid = atom
                .parse()
                .map_err(|_| Error::Parse(format!("bad UID {atom:?}")))?;
            record.uid = Some(uid);
        } else if key.eq_ignore_ascii_case("ENVELOPE") {
            record.envelope = Some(parse_envelope(lexer)?);
        } else if key.to_ascii_uppercase().starts_with("BODY[") {
            record.body = match lexer.require()? {
                Token::Quoted(s) => Some(s.into_bytes()),
                Token::Literal(data) => Some(data.to_vec()),
                Token::Atom(a) if a.eq_ignore_ascii_case("NIL") => None,
                other => {
                    return Err(Error::Parse(format!("expected body data, got {other:?}")));
                }
            };
        } else {
            // FLAGS, INTERNALDATE, RFC822.SIZE, MODSEQ: not requested but
            // some servers volunteer them. Skip the value.
            lexer.skip_value()?;
        }
    }
}

fn parse_envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(Token::LParen)?;

    let envelope = Envelope {
        date: lexer.nstring()?,
        subject: lexer.nstring()?,
        from: parse_address_list(lexer)?,
        sender: parse_address_list(lexer)?,
        reply_to: parse_address_list(lexer)?,
        to: parse_address_list(lexer)?,
        cc: parse_address_list(lexer)?,
        bcc: parse_address_list(lexer)?,
        in_reply_to: lexer.nstring()?,
        message_id: lexer.nstring()?,
    };

    lexer.expect(Token::RParen)?;
    Ok(envelope)
}

fn parse_address_list(lexer: &mut Lexer<'_>) -> Result<Vec<Address>> {
    match lexer.require()? {
        Token::Atom(a) if a.eq_ignore_ascii_case("NIL") => Ok(Vec::new()),
        Token::LParen => {
            let mut addresses = Vec::new();
            loop {
                match lexer.require()? {
                    Token::RParen => return Ok(addresses),
                    Token::LParen => {
                        let address = Address {
                            name: lexer.nstring()?,
                            adl: lexer.nstring()?,
                            mailbox: lexer.nstring()?,
                            host: lexer.nstring()?,
                        };
                        lexer.expect(Token::RParen)?;
                        addresses.push(address);
                    }
                    other => {
                        return Err(Error::Parse(format!("expected address, got {other:?}")));
                    }
                }
            }
        }
        other => Err(Error::Parse(format!(
            "expected address list, got {other:?}"
        ))),
    }
}

/// Lexer token.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    LParen,
    RParen,
    /// Unquoted atom, including bracketed forms like `BODY[TEXT]`.
    Atom(&'a str),
    /// Quoted string with escapes resolved.
    Quoted(String),
    /// Literal payload.
    Literal(&'a [u8]),
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>> {
        self.skip_whitespace();
        let Some(&b) = self.input.get(self.pos) else {
            return Ok(None);
        };

        match b {
            b'(' => {
                self.pos += 1;
                Ok(Some(Token::LParen))
            }
            b')' => {
                self.pos += 1;
                Ok(Some(Token::RParen))
            }
            b'"' => self.read_quoted().map(Some),
            b'{' => self.read_literal().map(Some),
            _ => self.read_atom().map(Some),
        }
    }

    /// Like [`Self::next_token`] but end-of-input is an error.
    fn require(&mut self) -> Result<Token<'a>> {
        self.next_token()?
            .ok_or_else(|| Error::Parse("unexpected end of response".into()))
    }

    fn expect(&mut self, token: Token<'_>) -> Result<()> {
        let got = self.require()?;
        if got == token {
            Ok(())
        } else {
            Err(Error::Parse(format!("expected {token:?}, got {got:?}")))
        }
    }

    fn expect_atom(&mut self) -> Result<String> {
        match self.require()? {
            Token::Atom(a) => Ok(a.to_string()),
            other => Err(Error::Parse(format!("expected atom, got {other:?}"))),
        }
    }

    /// Reads an nstring: quoted string, literal, or NIL.
    fn nstring(&mut self) -> Result<Option<String>> {
        match self.require()? {
            Token::Quoted(s) => Ok(Some(s)),
            Token::Literal(data) => Ok(Some(String::from_utf8_lossy(data).into_owned())),
            Token::Atom(a) if a.eq_ignore_ascii_case("NIL") => Ok(None),
            other => Err(Error::Parse(format!("expected nstring, got {other:?}"))),
        }
    }

    /// Skips one value: a single token, or a balanced parenthesized list.
    fn skip_value(&mut self) -> Result<()> {
        match self.require()? {
            Token::LParen => {
                let mut depth = 1usize;
                while depth > 0 {
                    match self.require()? {
                        Token::LParen => depth += 1,
                        Token::RParen => depth -= 1,
                        _ => {}
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Returns the unparsed remainder, CRLF stripped, as text.
    fn rest_of_line(&mut self) -> String {
        let rest = &self.input[self.pos.min(self.input.len())..];
        self.pos = self.input.len();
        let rest = rest.strip_suffix(b"\r\n").unwrap_or(rest);
        String::from_utf8_lossy(rest).trim().to_string()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.input.get(self.pos), Some(b' ' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn read_quoted(&mut self) -> Result<Token<'a>> {
        debug_assert_eq!(self.input[self.pos], b'"');
        self.pos += 1;

        let mut value = String::new();
        loop {
            let Some(&b) = self.input.get(self.pos) else {
                return Err(Error::Parse("unterminated quoted string".into()));
            };
            self.pos += 1;
            match b {
                b'"' => return Ok(Token::Quoted(value)),
                b'\\' => {
                    let Some(&escaped) = self.input.get(self.pos) else {
                        return Err(Error::Parse("dangling escape in quoted string".into()));
                    };
                    self.pos += 1;
                    value.push(escaped as char);
                }
                _ => value.push(b as char),
            }
        }
    }

    fn read_literal(&mut self) -> Result<Token<'a>> {
        debug_assert_eq!(self.input[self.pos], b'{');
        let close = self.input[self.pos..]
            .iter()
            .position(|&b| b == b'}')
            .ok_or_else(|| Error::Parse("unterminated literal length".into()))?;

        let digits = &self.input[self.pos + 1..self.pos + close];
        let digits = digits.strip_suffix(b"+").unwrap_or(digits);
        let len: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Parse("bad literal length".into()))?;

        // Skip past "{n}" and the CRLF that terminates the announcing line.
        self.pos += close + 1;
        if self.input[self.pos..].starts_with(b"\r\n") {
            self.pos += 2;
        }

        let end = self.pos + len;
        if end > self.input.len() {
            return Err(Error::Parse("literal truncated".into()));
        }
        let data = &self.input[self.pos..end];
        self.pos = end;
        Ok(Token::Literal(data))
    }

    fn read_atom(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        while let Some(&b) = self.input.get(self.pos) {
            if matches!(b, b' ' | b'(' | b')' | b'\r' | b'\n') {
                break;
            }
            self.pos += 1;
        }
        let atom = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| Error::Parse("non-UTF8 atom".into()))?;
        Ok(Token::Atom(atom))
    }
}
