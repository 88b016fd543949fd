//! Via and Route rewriting for forwarded messages
//!
//! Requests travelling forward get a Via pushed by this proxy, lose their
//! Route headers, and gain a Record-Route. Responses travelling back have the
//! proxy's Via popped. Only the header block is rewritten; the body is never
//! touched.

use std::net::SocketAddr;

use crate::header::{self, HeaderKind};
use crate::identity::ProxyIdentity;
use crate::message::SipMessage;

/// Record where a Via's sender was actually seen.
///
/// A bare `rport` flag becomes `received=IP;rport=PORT`; otherwise
/// `;received=IP` is appended.
pub fn stamp_received(via_line: &str, client_addr: SocketAddr) -> String {
    if header::has_rport(via_line) {
        let stamp = format!("received={};rport={}", client_addr.ip(), client_addr.port());
        let stamp: &str = &stamp;
        let mut replaced = false;
        via_line
            .split(';')
            .enumerate()
            .map(|(i, segment)| {
                if i > 0 && !replaced && segment.trim() == "rport" {
                    replaced = true;
                    stamp
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    } else {
        format!("{};received={}", via_line, client_addr.ip())
    }
}

/// Push this proxy's Via in front of every Via that carries a branch, and
/// stamp each original Via with the address it was received from.
///
/// The pushed Via reuses the original branch followed by `branch_suffix`.
pub fn add_top_via(
    message: &mut SipMessage,
    identity: &ProxyIdentity,
    client_addr: SocketAddr,
    branch_suffix: &str,
) {
    let lines = message.lines_mut();

    let mut rewritten = Vec::with_capacity(lines.len() + 1);
    for (i, line) in lines.drain(..).enumerate() {
        if i == 0 || header::kind_of(&line) != HeaderKind::Via {
            rewritten.push(line);
            continue;
        }
        if let Some(branch) = header::branch(&line) {
            rewritten.push(format!("{};branch={}{}", identity.via(), branch, branch_suffix));
        }
        rewritten.push(stamp_received(&line, client_addr));
    }
    *lines = rewritten;
}

/// Remove the first Via written by this proxy. Returns whether one was found.
pub fn remove_top_via(message: &mut SipMessage, identity: &ProxyIdentity) -> bool {
    let lines = message.lines_mut();
    let found = lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| identity.is_own_via(line))
        .map(|(i, _)| i);

    match found {
        Some(i) => {
            lines.remove(i);
            true
        }
        None => false,
    }
}

/// Drop every `Route:` header. Returns how many were removed.
pub fn remove_route(message: &mut SipMessage) -> usize {
    let lines = message.lines_mut();
    let before = lines.len();

    let mut index = 0;
    lines.retain(|line| {
        let keep = index == 0 || header::kind_of(line) != HeaderKind::Route;
        index += 1;
        keep
    });
    before - lines.len()
}

/// Insert this proxy's Record-Route right after the start line
pub fn insert_record_route(message: &mut SipMessage, identity: &ProxyIdentity) {
    let lines = message.lines_mut();
    let at = lines.len().min(1);
    lines.insert(at, identity.record_route().to_string());
}
