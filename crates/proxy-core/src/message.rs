//! Datagram splitting and first-line classification

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ProxyError, Result};

/// Line separator on the wire
pub const CRLF: &str = "\r\n";

/// SIP version token shared by request-lines and status-lines
pub const SIP_VERSION: &str = "SIP/2.0";

/// Request methods the proxy knows how to handle.
///
/// Method tokens are case-sensitive; `invite` is an unknown method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Register,
    Invite,
    Ack,
    Bye,
    Cancel,
    Options,
    Info,
    Message,
    Refer,
    Prack,
    Update,
    Subscribe,
    Publish,
    Notify,
    /// Any other token
    Other(String),
}

impl Method {
    pub fn from_token(token: &str) -> Self {
        match token {
            "REGISTER" => Method::Register,
            "INVITE" => Method::Invite,
            "ACK" => Method::Ack,
            "BYE" => Method::Bye,
            "CANCEL" => Method::Cancel,
            "OPTIONS" => Method::Options,
            "INFO" => Method::Info,
            "MESSAGE" => Method::Message,
            "REFER" => Method::Refer,
            "PRACK" => Method::Prack,
            "UPDATE" => Method::Update,
            "SUBSCRIBE" => Method::Subscribe,
            "PUBLISH" => Method::Publish,
            "NOTIFY" => Method::Notify,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Register => "REGISTER",
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Cancel => "CANCEL",
            Method::Options => "OPTIONS",
            Method::Info => "INFO",
            Method::Message => "MESSAGE",
            Method::Refer => "REFER",
            Method::Prack => "PRACK",
            Method::Update => "UPDATE",
            Method::Subscribe => "SUBSCRIBE",
            Method::Publish => "PUBLISH",
            Method::Notify => "NOTIFY",
            Method::Other(s) => s,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified first line of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    /// `METHOD sip:URI SIP/2.0`; `uri` excludes the `sip:` scheme
    Request { method: Method, uri: String },
    /// `SIP/2.0 CODE reason`
    Status { code: String },
}

impl StartLine {
    /// Classify a first line, or `None` if it is neither form
    pub fn classify(line: &str) -> Option<Self> {
        if let Some(rest) = line.strip_prefix("SIP/2.0 ") {
            let code = rest.split(' ').next().unwrap_or_default();
            return Some(StartLine::Status { code: code.to_string() });
        }

        let (method, rest) = line.split_once(' ')?;
        if method.is_empty() {
            return None;
        }
        let rest = rest.strip_prefix("sip:")?;
        let (uri, rest) = rest.split_once(' ')?;
        if !rest.starts_with(SIP_VERSION) {
            return None;
        }

        Some(StartLine::Request {
            method: Method::from_token(method),
            uri: uri.to_string(),
        })
    }
}

/// Separator between the header block and the body
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A SIP message: the start line and header lines as text, plus the body as
/// raw bytes.
///
/// Only the header block is decoded. The body is everything after the first
/// empty line and is carried through byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipMessage {
    lines: Vec<String>,
    /// `None` when the datagram has no empty line ending the header block
    body: Option<Bytes>,
}

impl SipMessage {
    /// Split a datagram into header lines and body, and check that its first
    /// line is a request-line or a status-line.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let message = Self::from_bytes(data);
        if message.start_line().is_none() {
            return Err(ProxyError::MalformedDatagram { len: data.len() });
        }
        Ok(message)
    }

    /// Split a datagram without classifying it
    pub fn from_bytes(data: &[u8]) -> Self {
        let (head, body) = match data
            .windows(HEADER_TERMINATOR.len())
            .position(|window| window == HEADER_TERMINATOR)
        {
            Some(pos) => (
                &data[..pos],
                Some(Bytes::copy_from_slice(&data[pos + HEADER_TERMINATOR.len()..])),
            ),
            None => (data, None),
        };

        Self {
            lines: String::from_utf8_lossy(head)
                .split(CRLF)
                .map(str::to_string)
                .collect(),
            body,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    pub fn start_line(&self) -> Option<StartLine> {
        StartLine::classify(self.first_line())
    }

    pub fn first_line(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or_default()
    }

    pub fn set_first_line(&mut self, line: impl Into<String>) {
        match self.lines.first_mut() {
            Some(first) => *first = line.into(),
            None => self.lines.push(line.into()),
        }
    }

    /// Start line followed by the header lines
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub(crate) fn lines_mut(&mut self) -> &mut Vec<String> {
        &mut self.lines
    }

    /// Header lines (start line excluded)
    pub fn header_lines(&self) -> &[String] {
        self.lines.get(1..).unwrap_or_default()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// The wire form: header lines joined with CRLF, then the empty line and
    /// the untouched body
    pub fn to_bytes(&self) -> Bytes {
        let head = self.lines.join(CRLF);
        let body_len = self.body.as_ref().map_or(0, Bytes::len);
        let mut out = BytesMut::with_capacity(head.len() + HEADER_TERMINATOR.len() + body_len);
        out.put_slice(head.as_bytes());
        if let Some(body) = &self.body {
            out.put_slice(HEADER_TERMINATOR);
            out.put_slice(body);
        }
        out.freeze()
    }
}

impl fmt::Display for SipMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}
