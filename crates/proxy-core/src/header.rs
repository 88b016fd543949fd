//! Header tokenizer and field extractors
//!
//! Header names are matched exactly as they appear on the wire, with the
//! compact aliases `f`, `t`, `m`, `l` and `v` treated the same as `From`,
//! `To`, `Contact`, `Content-Length` and `Via`.

/// Header kinds the proxy looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    From,
    To,
    Contact,
    ContentLength,
    Via,
    Route,
    RecordRoute,
    Expires,
    Other,
}

impl HeaderKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "From" | "f" => HeaderKind::From,
            "To" | "t" => HeaderKind::To,
            "Contact" | "m" => HeaderKind::Contact,
            "Content-Length" | "l" => HeaderKind::ContentLength,
            "Via" | "v" => HeaderKind::Via,
            "Route" => HeaderKind::Route,
            "Record-Route" => HeaderKind::RecordRoute,
            "Expires" => HeaderKind::Expires,
            _ => HeaderKind::Other,
        }
    }
}

/// One tokenized header line: `name: value;param=x;flag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header<'a> {
    pub kind: HeaderKind,
    /// Name as written (long or compact form)
    pub name: &'a str,
    /// Everything after the colon, leading whitespace removed
    pub value: &'a str,
}

impl<'a> Header<'a> {
    /// Tokenize a header line; `None` if it has no colon
    pub fn parse(line: &'a str) -> Option<Self> {
        let (name, value) = line.split_once(':')?;
        let name = name.trim_end();
        if name.is_empty() || name.contains(' ') {
            return None;
        }
        Some(Header {
            kind: HeaderKind::from_name(name),
            name,
            value: value.trim_start(),
        })
    }

    /// `;`-separated parameters of the value as `(name, value)` pairs.
    ///
    /// Parameters inside an angle-bracketed URI are included; a closing `>`
    /// glued to a parameter value is dropped.
    pub fn params(&self) -> impl Iterator<Item = (&'a str, Option<&'a str>)> {
        self.value.split(';').skip(1).map(|segment| {
            let segment = segment.trim();
            match segment.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim().trim_end_matches('>'))),
                None => (segment.trim_end_matches('>'), None),
            }
        })
    }

    /// Value of parameter `name`, if present with a value
    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.params()
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| value)
    }

    /// True if `name` appears as a parameter with no value
    pub fn has_flag(&self, name: &str) -> bool {
        self.params().any(|(key, value)| key == name && value.is_none())
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params().any(|(key, _)| key == name)
    }
}

/// Kind of a header line, `Other` for lines that do not tokenize
pub fn kind_of(line: &str) -> HeaderKind {
    Header::parse(line).map(|h| h.kind).unwrap_or(HeaderKind::Other)
}

/// First header of `kind` among `headers`
pub fn find_header<'a>(headers: &'a [String], kind: HeaderKind) -> Option<Header<'a>> {
    headers
        .iter()
        .filter_map(|line| Header::parse(line))
        .find(|header| header.kind == kind)
}

/// `user@host` from the first `sip:user@host` in `text`.
///
/// The user part runs to the `@`; the host part stops at `;`, `>` or the end.
pub fn sip_user_host(text: &str) -> Option<String> {
    let mut rest = text;
    while let Some(pos) = rest.find("sip:") {
        let after = &rest[pos + 4..];
        if let Some(at) = after.find('@') {
            let user = &after[..at];
            let host_part = &after[at + 1..];
            let host_end = host_part.find([';', '>']).unwrap_or(host_part.len());
            return Some(format!("{}@{}", user, host_part[..host_end].trim_end()));
        }
        rest = after;
    }
    None
}

/// Bare `sip:address` from `text`, stopping at space, `;` or `>`
pub fn sip_address(text: &str) -> Option<String> {
    let pos = text.find("sip:")?;
    let after = &text[pos + 4..];
    let end = after.find([' ', ';', '>']).unwrap_or(after.len());
    Some(after[..end].to_string())
}

/// Address-of-record of the first From or To header.
///
/// `None` when the header is absent or holds no `sip:user@host`.
pub fn address_of_record(headers: &[String], kind: HeaderKind) -> Option<String> {
    find_header(headers, kind).and_then(|header| sip_user_host(header.value))
}

/// Registration lifetime used when the only expiry given does not parse
pub const DEFAULT_EXPIRES: u32 = 3600;

/// An `expires=` parameter or `Expires:` header value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Delta-seconds, saturated at `u32::MAX`
    Seconds(u32),
    /// Anything that is not a run of ASCII digits
    Malformed,
}

impl Expiry {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Expiry::Malformed;
        }
        // All digits, so the only possible failure is overflow
        let seconds = value
            .parse::<u64>()
            .map_or(u32::MAX, |n| u32::try_from(n).unwrap_or(u32::MAX));
        Expiry::Seconds(seconds)
    }
}

/// Lifetime in seconds for a REGISTER.
///
/// A well-formed Contact `expires=` wins over a well-formed `Expires:` header.
/// With no expiry at all the result is 0 (unregister). When every value given
/// is malformed the binding gets [`DEFAULT_EXPIRES`] instead of being removed.
pub fn effective_expiry(contact: Option<Expiry>, header: Option<Expiry>) -> u32 {
    match (contact, header) {
        (Some(Expiry::Seconds(seconds)), _) | (_, Some(Expiry::Seconds(seconds))) => seconds,
        (None, None) => 0,
        _ => DEFAULT_EXPIRES,
    }
}

/// Contact location and its `expires` parameter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactInfo {
    /// `user@host[:port]` when present, otherwise the bare `sip:` address
    pub address: String,
    pub expires: Option<Expiry>,
}

/// Contact (or `m`) header: location plus `expires=` parameter
pub fn contact(headers: &[String]) -> Option<ContactInfo> {
    let header = find_header(headers, HeaderKind::Contact)?;
    let address = sip_user_host(header.value)
        .or_else(|| sip_address(header.value))
        .unwrap_or_default();
    let expires = header.param("expires").map(Expiry::parse);
    Some(ContactInfo { address, expires })
}

/// Value of a standalone `Expires:` header
pub fn expires_header(headers: &[String]) -> Option<Expiry> {
    find_header(headers, HeaderKind::Expires).map(|header| Expiry::parse(header.value))
}

/// `branch` parameter of a Via line, or `None`
pub fn branch(via_line: &str) -> Option<&str> {
    Header::parse(via_line)?.param("branch")
}

/// True if a Via line asks for `rport` (the bare flag, not `rport=N`)
pub fn has_rport(via_line: &str) -> bool {
    Header::parse(via_line).map(|h| h.has_flag("rport")).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_header_kind_aliases() {
        assert_eq!(HeaderKind::from_name("f"), HeaderKind::From);
        assert_eq!(HeaderKind::from_name("t"), HeaderKind::To);
        assert_eq!(HeaderKind::from_name("m"), HeaderKind::Contact);
        assert_eq!(HeaderKind::from_name("l"), HeaderKind::ContentLength);
        assert_eq!(HeaderKind::from_name("v"), HeaderKind::Via);
        assert_eq!(HeaderKind::from_name("via"), HeaderKind::Other);
        assert_eq!(kind_of("Record-Route: <sip:1.2.3.4;lr>"), HeaderKind::RecordRoute);
        assert_eq!(kind_of("Route: <sip:1.2.3.4;lr>"), HeaderKind::Route);
        assert_eq!(kind_of("hello world"), HeaderKind::Other);
    }

    #[test]
    fn test_params() {
        let header =
            Header::parse("Via: SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK74bf9;rport").unwrap();
        assert_eq!(header.kind, HeaderKind::Via);
        assert_eq!(header.value, "SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK74bf9;rport");
        assert_eq!(header.param("branch"), Some("z9hG4bK74bf9"));
        assert!(header.has_flag("rport"));
        assert!(!header.has_flag("branch"));
    }

    #[test]
    fn test_address_of_record() {
        let headers = lines(&[
            "From: \"Alice\" <sip:alice@example.com>;tag=1928301774",
            "t: sip:bob@example.com",
        ]);
        assert_eq!(address_of_record(&headers, HeaderKind::From), Some("alice@example.com".into()));
        assert_eq!(address_of_record(&headers, HeaderKind::To), Some("bob@example.com".into()));
        assert_eq!(address_of_record(&headers, HeaderKind::Contact), None);

        let no_user = lines(&["To: <sip:example.com>"]);
        assert_eq!(address_of_record(&no_user, HeaderKind::To), None);
    }

    #[test]
    fn test_only_first_header_counts() {
        let headers = lines(&["To: <tel:+15551234>", "To: <sip:bob@example.com>"]);
        assert_eq!(address_of_record(&headers, HeaderKind::To), None);
    }

    #[test]
    fn test_contact_forms() {
        let full = lines(&["Contact: <sip:alice@192.168.1.5:5060>;expires=3600"]);
        assert_eq!(
            contact(&full),
            Some(ContactInfo {
                address: "alice@192.168.1.5:5060".into(),
                expires: Some(Expiry::Seconds(3600)),
            })
        );

        let bare = lines(&["m: <sip:192.168.1.5:5060;transport=udp>"]);
        assert_eq!(
            contact(&bare),
            Some(ContactInfo { address: "192.168.1.5:5060".into(), expires: None })
        );

        let inside = lines(&["Contact: <sip:carol@10.1.1.1;expires=60>"]);
        assert_eq!(contact(&inside).unwrap().expires, Some(Expiry::Seconds(60)));

        assert_eq!(contact(&lines(&["To: <sip:bob@example.com>"])), None);
    }

    #[test]
    fn test_expires_header() {
        assert_eq!(expires_header(&lines(&["Expires: 3600"])), Some(Expiry::Seconds(3600)));
        assert_eq!(expires_header(&lines(&["Expires: soon"])), Some(Expiry::Malformed));
        assert_eq!(expires_header(&lines(&["Min-Expires: 60"])), None);
    }

    #[test]
    fn test_expiry_saturates() {
        assert_eq!(Expiry::parse(" 4294967295 "), Expiry::Seconds(u32::MAX));
        assert_eq!(Expiry::parse("4294967296"), Expiry::Seconds(u32::MAX));
        assert_eq!(Expiry::parse("99999999999999999999999"), Expiry::Seconds(u32::MAX));
        assert_eq!(Expiry::parse("0"), Expiry::Seconds(0));
    }

    #[test]
    fn test_malformed_expiry() {
        for value in ["", "soon", "-1", "+60", "60s", "1e3"] {
            assert_eq!(Expiry::parse(value), Expiry::Malformed, "value {:?}", value);
        }
    }

    #[test]
    fn test_effective_expiry() {
        let seconds = |n| Some(Expiry::Seconds(n));
        let malformed = Some(Expiry::Malformed);

        assert_eq!(effective_expiry(None, None), 0);
        assert_eq!(effective_expiry(seconds(0), seconds(3600)), 0);
        assert_eq!(effective_expiry(None, seconds(60)), 60);
        assert_eq!(effective_expiry(malformed, seconds(60)), 60);
        assert_eq!(effective_expiry(seconds(30), malformed), 30);
        assert_eq!(effective_expiry(malformed, None), DEFAULT_EXPIRES);
        assert_eq!(effective_expiry(None, malformed), DEFAULT_EXPIRES);
        assert_eq!(effective_expiry(malformed, malformed), DEFAULT_EXPIRES);
    }

    #[test]
    fn test_branch_and_rport() {
        assert_eq!(branch("v: SIP/2.0/UDP h;branch=abc;rport"), Some("abc"));
        assert_eq!(branch("Via: SIP/2.0/UDP h"), None);

        assert!(has_rport("Via: SIP/2.0/UDP h;rport"));
        assert!(has_rport("Via: SIP/2.0/UDP h;rport;branch=abc"));
        assert!(!has_rport("Via: SIP/2.0/UDP h;rport=5060;branch=abc"));
        assert!(!has_rport("Via: SIP/2.0/UDP h;branch=rport"));
    }
}
