//! Locally generated responses

use std::fmt;
use std::net::SocketAddr;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::header::{Header, HeaderKind};
use crate::message::{SipMessage, CRLF};
use crate::routing::stamp_received;

/// Tag used by [`TagPolicy::Fixed`] unless configured otherwise
pub const DEFAULT_FIXED_TAG: &str = "123456";

/// Status codes the proxy answers with itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    BadRequest,
    Forbidden,
    NotAcceptable,
    TemporarilyUnavailable,
    ServerInternalError,
}

impl StatusCode {
    pub fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotAcceptable => 406,
            StatusCode::TemporarilyUnavailable => 480,
            StatusCode::ServerInternalError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            StatusCode::Ok => "Everything Going Super Well",
            StatusCode::BadRequest => "Request Gone Wrong",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotAcceptable => "Think Again, Buddy",
            StatusCode::TemporarilyUnavailable => "The Called Destination is Too Popular for You",
            StatusCode::ServerInternalError => "Server In Crisis",
        }
    }

    /// `SIP/2.0 <code> <reason>`
    pub fn status_line(self) -> String {
        format!("SIP/2.0 {} {}", self.code(), self.reason())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// How the To tag of a local response is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPolicy {
    /// The same tag on every response
    Fixed(String),
    /// A fresh random tag per response
    Random,
}

impl Default for TagPolicy {
    fn default() -> Self {
        TagPolicy::Fixed(DEFAULT_FIXED_TAG.to_string())
    }
}

impl TagPolicy {
    pub fn next_tag(&self) -> String {
        match self {
            TagPolicy::Fixed(tag) => tag.clone(),
            TagPolicy::Random => rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(10)
                .map(char::from)
                .collect(),
        }
    }
}

/// Build a response to `request` from its header block.
///
/// The start line is replaced, a To without a tag gets one, every Via is
/// stamped with `received`/`rport`, Content-Length is forced to 0 and the
/// body is dropped.
pub fn build_response(
    status: StatusCode,
    request: &SipMessage,
    client_addr: SocketAddr,
    tags: &TagPolicy,
) -> String {
    let mut lines = Vec::with_capacity(request.lines().len() + 2);
    lines.push(status.status_line());

    for line in request.header_lines() {
        let rewritten = match Header::parse(line) {
            Some(header) => match header.kind {
                HeaderKind::To if !header.has_param("tag") => {
                    format!("{};tag={}", line, tags.next_tag())
                }
                HeaderKind::Via => stamp_received(line, client_addr),
                HeaderKind::ContentLength => format!("{}: 0", header.name),
                _ => line.clone(),
            },
            None => line.clone(),
        };
        lines.push(rewritten);
    }

    // Blank line closing the header block, then an empty body
    lines.push(String::new());
    lines.push(String::new());
    lines.join(CRLF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn register() -> SipMessage {
        SipMessage::from_text(
            "REGISTER sip:example.com SIP/2.0\r\n\
             Via: SIP/2.0/UDP 192.168.1.5:5060;branch=z9hG4bKnashds7;rport\r\n\
             From: <sip:alice@example.com>;tag=456248\r\n\
             To: <sip:alice@example.com>\r\n\
             Call-ID: 843817637684230@998sdasdh09\r\n\
             CSeq: 1826 REGISTER\r\n\
             Contact: <sip:alice@192.168.1.5:5060>\r\n\
             Expires: 3600\r\n\
             l: 5\r\n\
             \r\n\
             hello",
        )
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(StatusCode::Ok.status_line(), "SIP/2.0 200 Everything Going Super Well");
        assert_eq!(
            StatusCode::TemporarilyUnavailable.status_line(),
            "SIP/2.0 480 The Called Destination is Too Popular for You"
        );
        assert_eq!(StatusCode::NotAcceptable.to_string(), "406 Think Again, Buddy");
    }

    #[test]
    fn test_build_response() {
        let client: SocketAddr = "198.51.100.4:6000".parse().unwrap();
        let response = build_response(StatusCode::Ok, &register(), client, &TagPolicy::default());

        assert_eq!(
            response,
            "SIP/2.0 200 Everything Going Super Well\r\n\
             Via: SIP/2.0/UDP 192.168.1.5:5060;branch=z9hG4bKnashds7;\
             received=198.51.100.4;rport=6000\r\n\
             From: <sip:alice@example.com>;tag=456248\r\n\
             To: <sip:alice@example.com>;tag=123456\r\n\
             Call-ID: 843817637684230@998sdasdh09\r\n\
             CSeq: 1826 REGISTER\r\n\
             Contact: <sip:alice@192.168.1.5:5060>\r\n\
             Expires: 3600\r\n\
             l: 0\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_existing_to_tag_is_kept() {
        let request =
            SipMessage::from_text("BYE sip:bob@b SIP/2.0\r\nt: <sip:bob@b>;tag=abc\r\n\r\n");
        let response = build_response(
            StatusCode::BadRequest,
            &request,
            "198.51.100.4:6000".parse().unwrap(),
            &TagPolicy::default(),
        );
        assert_eq!(response, "SIP/2.0 400 Request Gone Wrong\r\nt: <sip:bob@b>;tag=abc\r\n\r\n");
    }

    #[test]
    fn test_random_tags() {
        let a = TagPolicy::Random.next_tag();
        let b = TagPolicy::Random.next_tag();
        assert_eq!(a.len(), 10);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
