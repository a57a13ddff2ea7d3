//! Integration tests for the Selective-Repeat engine.
//!
//! As in the Go-Back-N tests, the engine runs in a tokio task and a raw UDP
//! mock peer on loopback plays the receiver.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

use udp_arq::packet::{Packet, PacketType};
use udp_arq::selective_repeat::SrEngine;
use udp_arq::socket::Socket;
use udp_arq::{ArqConfig, ArqError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn mock_peer() -> (UdpSocket, SocketAddr) {
    let sock = UdpSocket::bind("127.0.0.1:0").await.expect("bind peer");
    let addr = sock.local_addr().unwrap();
    (sock, addr)
}

async fn engine_socket() -> Arc<Socket> {
    let socket = Socket::bind("127.0.0.1:0".parse().unwrap())
        .await
        .expect("bind engine");
    Arc::new(socket)
}

async fn recv_packet(sock: &UdpSocket) -> (Packet, SocketAddr) {
    let mut buf = [0u8; 2048];
    let (n, from) = tokio::time::timeout(Duration::from_secs(2), sock.recv_from(&mut buf))
        .await
        .expect("timed out waiting for engine")
        .unwrap();
    let pkt = Packet::decode(&buf[..n]).expect("malformed packet");
    (pkt, from)
}

async fn try_recv_packet(sock: &UdpSocket, wait: Duration) -> Option<Packet> {
    let mut buf = [0u8; 2048];
    match tokio::time::timeout(wait, sock.recv_from(&mut buf)).await {
        Ok(Ok((n, _))) => Some(Packet::decode(&buf[..n]).unwrap()),
        _ => None,
    }
}

async fn reply(sock: &UdpSocket, pkt: Packet, to: SocketAddr) {
    sock.send_to(&pkt.encode(), to).await.unwrap();
}

fn config(timeout_ms: u64, window: u32, max_payload: usize) -> ArqConfig {
    ArqConfig {
        window_size: window,
        max_payload,
        ..ArqConfig::default()
    }
    .with_timeout_ms(timeout_ms)
}

/// Read packets until the EOT arrives, acknowledging any DATA on the way.
async fn ack_until_eot(peer: &UdpSocket, engine_addr: SocketAddr) {
    loop {
        let (pkt, _) = recv_packet(peer).await;
        match pkt.ptype {
            PacketType::Data => reply(peer, Packet::ack(pkt.seq), engine_addr).await,
            PacketType::Eot => return,
            other => panic!("unexpected {other:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Test 1: 23-byte file, 5-byte chunks, window 10
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sr_scenario_23_bytes() {
    let (peer, peer_addr) = mock_peer().await;
    let input: Vec<u8> = (100u8..123).collect();

    let engine = SrEngine::new(
        engine_socket().await,
        peer_addr,
        Cursor::new(input.clone()),
        config(5_000, 10, 5),
    );
    let handle = tokio::spawn(engine.run());

    // Workers run concurrently, so arrival order is not guaranteed.
    let mut packets = Vec::new();
    let mut engine_addr = None;
    for _ in 0..5 {
        let (pkt, addr) = recv_packet(&peer).await;
        assert_eq!(pkt.ptype, PacketType::Data);
        packets.push(pkt);
        engine_addr = Some(addr);
    }
    let engine_addr = engine_addr.unwrap();
    packets.sort_by_key(|p| p.seq);

    let seqs: Vec<u32> = packets.iter().map(|p| p.seq).collect();
    let lens: Vec<usize> = packets.iter().map(|p| p.payload.len()).collect();
    let joined: Vec<u8> = packets.iter().flat_map(|p| p.payload.clone()).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    assert_eq!(lens, vec![5, 5, 5, 5, 3]);
    assert_eq!(joined, input);

    for seq in 1..=5 {
        reply(&peer, Packet::ack(seq), engine_addr).await;
    }

    let (eot, _) = recv_packet(&peer).await;
    assert_eq!(eot.ptype, PacketType::Eot);
    reply(&peer, Packet::eot(), engine_addr).await;

    let summary = handle.await.unwrap().expect("transfer failed");
    assert_eq!(summary.final_base, 6);
    assert_eq!(summary.data_packets, 5);
    assert_eq!(summary.payload_bytes, 23);
    assert!(try_recv_packet(&peer, Duration::from_millis(100)).await.is_none());
}

// ---------------------------------------------------------------------------
// Test 2: an ACK past a gap does not advance the base
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sr_gap_holds_window_until_filled() {
    let (peer, peer_addr) = mock_peer().await;

    // Seven 1-byte chunks, window of six: seq 7 can only go out once base moves.
    let engine = SrEngine::new(
        engine_socket().await,
        peer_addr,
        Cursor::new(vec![3u8; 7]),
        config(10_000, 6, 1),
    );
    let handle = tokio::spawn(engine.run());

    let mut engine_addr = None;
    let mut seqs = Vec::new();
    for _ in 0..6 {
        let (pkt, addr) = recv_packet(&peer).await;
        seqs.push(pkt.seq);
        engine_addr = Some(addr);
    }
    let engine_addr = engine_addr.unwrap();
    seqs.sort_unstable();
    assert_eq!(seqs, vec![1, 2, 3, 4, 5, 6]);

    // base + 5 first: nothing may move.
    reply(&peer, Packet::ack(6), engine_addr).await;
    assert!(
        try_recv_packet(&peer, Duration::from_millis(200)).await.is_none(),
        "window advanced past an unacknowledged gap"
    );

    // Fill the gap in scrambled order; base jumps to 7 and seq 7 is released.
    for seq in [3, 1, 5, 2, 4] {
        reply(&peer, Packet::ack(seq), engine_addr).await;
    }
    let (pkt, _) = recv_packet(&peer).await;
    assert_eq!((pkt.ptype, pkt.seq), (PacketType::Data, 7));
    reply(&peer, Packet::ack(7), engine_addr).await;

    let (eot, _) = recv_packet(&peer).await;
    assert_eq!(eot.ptype, PacketType::Eot);
    reply(&peer, Packet::eot(), engine_addr).await;

    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.final_base, 8);
    assert_eq!(summary.retransmissions, 0);
}

// ---------------------------------------------------------------------------
// Test 3: only the unacknowledged packet is retransmitted
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sr_retransmits_only_missing_packet() {
    let (peer, peer_addr) = mock_peer().await;

    let engine = SrEngine::new(
        engine_socket().await,
        peer_addr,
        Cursor::new(vec![1u8; 3]),
        config(150, 3, 1),
    );
    let handle = tokio::spawn(engine.run());

    let mut engine_addr = None;
    for _ in 0..3 {
        let (pkt, addr) = recv_packet(&peer).await;
        engine_addr = Some(addr);
        if pkt.seq != 2 {
            reply(&peer, Packet::ack(pkt.seq), engine_addr.unwrap()).await;
        }
    }
    let engine_addr = engine_addr.unwrap();

    let mut resent = Vec::new();
    while let Some(pkt) = try_recv_packet(&peer, Duration::from_millis(400)).await {
        resent.push(pkt.seq);
        if resent.len() == 2 {
            break;
        }
    }
    assert_eq!(resent, vec![2, 2]);

    reply(&peer, Packet::ack(2), engine_addr).await;
    ack_until_eot(&peer, engine_addr).await;
    reply(&peer, Packet::eot(), engine_addr).await;

    let summary = handle.await.unwrap().unwrap();
    assert_eq!(summary.final_base, 4);
    assert!(summary.retransmissions >= 2);
}

// ---------------------------------------------------------------------------
// Test 4: duplicate ACKs and stray packets are harmless
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sr_duplicate_acks_and_noise() {
    let (peer, peer_addr) = mock_peer().await;

    let engine = SrEngine::new(
        engine_socket().await,
        peer_addr,
        Cursor::new(vec![8u8; 2]),
        config(5_000, 4, 1),
    );
    let handle = tokio::spawn(engine.run());

    let (_, engine_addr) = recv_packet(&peer).await;
    let _ = recv_packet(&peer).await;

    reply(&peer, Packet::ack(1), engine_addr).await;
    reply(&peer, Packet::ack(1), engine_addr).await;
    reply(&peer, Packet::ack(42), engine_addr).await;
    peer.send_to(&[0, 0, 0], engine_addr).await.unwrap();
    reply(&peer, Packet::ack(2), engine_addr).await;

    let (eot, _) = recv_packet(&peer).await;
    assert_eq!(eot.ptype, PacketType::Eot);
    reply(&peer, Packet::ack(2), engine_addr).await;
    reply(&peer, Packet::eot(), engine_addr).await;

    let summary = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("engine did not finish")
        .unwrap()
        .unwrap();
    assert_eq!(summary.final_base, 3);
}

// ---------------------------------------------------------------------------
// Test 5: without the peer's EOT the final wait never ends
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sr_waits_forever_for_peer_eot() {
    let (peer, peer_addr) = mock_peer().await;

    let engine = SrEngine::new(
        engine_socket().await,
        peer_addr,
        Cursor::new(vec![2u8; 2]),
        config(5_000, 4, 1),
    );
    let run = tokio::spawn(engine.run());

    let (_, engine_addr) = recv_packet(&peer).await;
    let _ = recv_packet(&peer).await;
    reply(&peer, Packet::ack(1), engine_addr).await;
    reply(&peer, Packet::ack(2), engine_addr).await;
    let (eot, _) = recv_packet(&peer).await;
    assert_eq!(eot.ptype, PacketType::Eot);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!run.is_finished(), "engine terminated without a peer EOT");
    run.abort();
}

// ---------------------------------------------------------------------------
// Test 6: a silent peer is retried forever by default
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sr_silent_peer_never_completes() {
    let (peer, peer_addr) = mock_peer().await;

    let engine = SrEngine::new(
        engine_socket().await,
        peer_addr,
        Cursor::new(vec![0u8; 3]),
        config(20, 4, 1),
    );
    let outcome = tokio::time::timeout(Duration::from_millis(300), engine.run()).await;
    assert!(outcome.is_err(), "engine terminated without any ACK");

    let mut seen = 0;
    while try_recv_packet(&peer, Duration::from_millis(10)).await.is_some() {
        seen += 1;
    }
    assert!(seen >= 6, "expected per-packet retransmissions, saw {seen}");
}

// ---------------------------------------------------------------------------
// Test 7: the optional retry ceiling fails the transfer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sr_retry_ceiling() {
    let (_peer, peer_addr) = mock_peer().await;
    let cfg = ArqConfig {
        max_retries: Some(3),
        ..config(20, 1, 4)
    };

    let engine = SrEngine::new(engine_socket().await, peer_addr, Cursor::new(vec![0u8; 4]), cfg);
    let result = tokio::time::timeout(Duration::from_secs(2), engine.run())
        .await
        .expect("retry ceiling not enforced");
    assert!(
        matches!(result, Err(ArqError::RetriesExhausted { seq: 1 })),
        "got {result:?}"
    );
}


// ---------------------------------------------------------------------------
// Test 8: a failed send is fatal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sr_send_failure_is_fatal() {
    // An IPv4 socket cannot reach an IPv6 peer.
    let unreachable: SocketAddr = "[::1]:9".parse().unwrap();

    let engine = SrEngine::new(
        engine_socket().await,
        unreachable,
        Cursor::new(vec![0u8; 4]),
        config(50, 4, 4),
    );
    let result = tokio::time::timeout(Duration::from_secs(2), engine.run())
        .await
        .expect("engine hung on a failed send");
    assert!(matches!(result, Err(ArqError::Send(_))), "got {result:?}");
}

// ---------------------------------------------------------------------------
// Test 9: unusable settings are rejected before anything is sent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sr_rejects_invalid_config() {
    let (peer, peer_addr) = mock_peer().await;

    for cfg in [config(50, 0, 4), config(50, u32::MAX, 4), config(50, 4, 0)] {
        let input = Cursor::new(vec![1u8; 8]);
        let engine = SrEngine::new(engine_socket().await, peer_addr, input, cfg);
        let result = engine.run().await;
        assert!(matches!(result, Err(ArqError::InvalidConfig(_))), "got {result:?}");
    }
    assert!(try_recv_packet(&peer, Duration::from_millis(50)).await.is_none());
}
