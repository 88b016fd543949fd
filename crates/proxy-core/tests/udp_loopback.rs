use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use siprelay_proxy_core::prelude::*;
use siprelay_sip_transport::{Transport, UdpTransport};
use tokio::net::UdpSocket;
use tokio::time::timeout;

async fn recv_text(socket: &UdpSocket) -> String {
    let mut buf = vec![0u8; 4096];
    let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
        .await
        .expect("timed out waiting for datagram")
        .unwrap();
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

fn register(user: &str, addr: SocketAddr) -> String {
    format!(
        "REGISTER sip:example.com SIP/2.0\r\n\
         Via: SIP/2.0/UDP {addr};branch=z9hG4bKreg{user};rport\r\n\
         From: <sip:{user}@example.com>;tag=1\r\n\
         To: <sip:{user}@example.com>\r\n\
         Contact: <sip:{user}@{addr}>\r\n\
         Expires: 60\r\n\
         Content-Length: 0\r\n\
         \r\n"
    )
}

#[tokio::test]
async fn test_register_and_invite_over_udp() {
    let (transport, events) = UdpTransport::bind("127.0.0.1:0".parse().unwrap(), None)
        .await
        .unwrap();
    let proxy_addr = transport.local_addr().unwrap();

    let dispatcher = Dispatcher::new(
        Arc::new(RegistrarStore::new()),
        ProxyIdentity::new(proxy_addr.ip(), proxy_addr.port()),
    );
    let transport: Arc<dyn Transport> = Arc::new(transport);
    let server = ProxyServer::new(Arc::new(dispatcher), transport.clone());
    let running = tokio::spawn(async move { server.run(events).await });

    let alice = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let bob = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let alice_addr = alice.local_addr().unwrap();
    let bob_addr = bob.local_addr().unwrap();

    alice.send_to(register("alice", alice_addr).as_bytes(), proxy_addr).await.unwrap();
    assert!(recv_text(&alice).await.starts_with("SIP/2.0 200 Everything Going Super Well\r\n"));
    bob.send_to(register("bob", bob_addr).as_bytes(), proxy_addr).await.unwrap();
    assert!(recv_text(&bob).await.starts_with("SIP/2.0 200 "));

    let invite = format!(
        "INVITE sip:bob@example.com SIP/2.0\r\n\
         Via: SIP/2.0/UDP {alice_addr};branch=z9hG4bKinv1\r\n\
         From: <sip:alice@example.com>;tag=2\r\n\
         To: <sip:bob@example.com>\r\n\
         Content-Length: 0\r\n\
         \r\n"
    );
    alice.send_to(invite.as_bytes(), proxy_addr).await.unwrap();

    let forwarded = recv_text(&bob).await;
    let lines: Vec<&str> = forwarded.split("\r\n").collect();
    assert_eq!(lines[0], "INVITE sip:bob@example.com SIP/2.0");
    assert_eq!(lines[1], format!("Record-Route: <sip:{};lr>", proxy_addr));
    assert_eq!(lines[2], format!("Via: SIP/2.0/UDP {};branch=z9hG4bKinv1m", proxy_addr));

    // Responses from bob travel back to alice without the proxy's Via
    let ringing = forwarded
        .replacen("INVITE sip:bob@example.com SIP/2.0", "SIP/2.0 180 Ringing", 1);
    bob.send_to(ringing.as_bytes(), proxy_addr).await.unwrap();
    let relayed = recv_text(&alice).await;
    assert!(relayed.starts_with("SIP/2.0 180 Ringing\r\n"));
    assert!(!relayed.contains("branch=z9hG4bKinv1m"));

    transport.close().await.unwrap();
    timeout(Duration::from_secs(2), running).await.unwrap().unwrap();
}
