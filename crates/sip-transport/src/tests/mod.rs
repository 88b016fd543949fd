use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::memory::MemoryTransport;
use crate::transport::{Transport, TransportEvent};
use crate::{bind_udp, Error};

fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

#[tokio::test]
async fn test_udp_receive_and_send() {
    let (transport, mut events) = bind_udp(loopback()).await.unwrap();
    let server_addr = transport.local_addr().unwrap();

    let client = UdpSocket::bind(loopback()).await.unwrap();
    let client_addr = client.local_addr().unwrap();
    client.send_to(b"OPTIONS sip:proxy SIP/2.0\r\n\r\n", server_addr).await.unwrap();

    let event = timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap();
    match event {
        TransportEvent::DatagramReceived { data, source, destination } => {
            assert_eq!(&data[..], b"OPTIONS sip:proxy SIP/2.0\r\n\r\n");
            assert_eq!(source, client_addr);
            assert_eq!(destination, server_addr);
        }
        other => panic!("Unexpected event: {:?}", other),
    }

    transport.send_datagram(b"SIP/2.0 200 OK\r\n\r\n", client_addr).await.unwrap();
    let mut buf = [0u8; 128];
    let (len, from) = timeout(Duration::from_secs(2), client.recv_from(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..len], b"SIP/2.0 200 OK\r\n\r\n");
    assert_eq!(from, server_addr);
}

#[tokio::test]
async fn test_udp_close_ends_receive_loop() {
    let (transport, mut events) = bind_udp(loopback()).await.unwrap();
    transport.close().await.unwrap();
    assert!(transport.is_closed());

    let event = timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap();
    assert!(matches!(event, TransportEvent::Closed));

    let result = transport.send_datagram(b"x", "127.0.0.1:9".parse().unwrap()).await;
    assert!(matches!(result, Err(Error::TransportClosed)));
}

#[tokio::test]
async fn test_udp_rejects_oversized_datagram() {
    let (transport, _events) = bind_udp(loopback()).await.unwrap();
    let big = vec![b'a'; 70_000];
    let result = transport.send_datagram(&big, "127.0.0.1:9".parse().unwrap()).await;
    assert!(matches!(result, Err(Error::PacketTooLarge(70_000, _))));
}

#[tokio::test]
async fn test_memory_transport_records_sends() {
    let transport = MemoryTransport::new("10.0.0.1:5060".parse().unwrap());
    let dest: SocketAddr = "10.0.0.2:5062".parse().unwrap();

    transport.send_datagram(b"first", dest).await.unwrap();
    transport.send_datagram(b"second", dest).await.unwrap();

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].text(), "first");
    assert_eq!(sent[1].destination, dest);

    assert_eq!(transport.take_sent().len(), 2);
    assert!(transport.sent().is_empty());

    transport.close().await.unwrap();
    assert!(transport.send_datagram(b"late", dest).await.is_err());
}
