use std::{
    io::{ErrorKind, Read, Write},
    net::TcpStream,
    thread,
    time::Duration,
};

use xvc_protocol::{Version, bits};
use xvc_sim::{
    chain::{Chain, IR_CAPTURE},
    instruction::Instruction,
    tap::TapState,
};
use xvc_tests::TestServer;

const RESET_TO_IDLE: [bool; 6] = [true, true, true, true, true, false];

fn raw_exchange(server: &TestServer, request: &[u8], response_len: usize) -> Vec<u8> {
    let mut tcp = TcpStream::connect(server.addr()).unwrap();
    tcp.write_all(request).unwrap();
    let mut response = vec![0; response_len];
    tcp.read_exact(&mut response).unwrap();
    response
}

fn assert_closed(tcp: &mut TcpStream) {
    let mut rest = Vec::new();
    match tcp.read_to_end(&mut rest) {
        Ok(_) => assert!(rest.is_empty(), "unexpected answer {:?}", rest),
        Err(e) => assert_eq!(e.kind(), ErrorKind::ConnectionReset),
    }
}

#[test]
fn getinfo_literal() {
    let server = TestServer::start(Chain::new());
    assert_eq!(
        raw_exchange(&server, b"getinfo:", 20),
        b"xvcServer_v1.0:1024\n"
    );

    let info = server.client().get_info().unwrap();
    assert_eq!(info.version(), Version::V1_0);
    assert_eq!(info.max_vector_len(), 1024);
}

#[test]
fn settck_echoes_period() {
    let server = TestServer::start(Chain::new());
    let mut request = b"settck:".to_vec();
    request.extend_from_slice(&1000u32.to_le_bytes());
    assert_eq!(raw_exchange(&server, &request, 4), 1000u32.to_le_bytes());

    assert_eq!(server.client().set_tck(u32::MAX).unwrap(), u32::MAX);
}

#[test]
fn read_idcode() {
    let server = TestServer::start(Chain::new());
    let mut client = server.client();

    client.shift_bits(&RESET_TO_IDLE, &[false; 6]).unwrap();
    client
        .shift_bits(&[true, false, false], &[false; 3])
        .unwrap();
    assert_eq!(server.chain().lock().unwrap().state(), TapState::ShiftDr);

    let tdo = client.shift(32, &[0x00; 4], &[0x00; 4]).unwrap();
    assert_eq!(&tdo[..], &0x0364_c093u32.to_le_bytes());
    assert_eq!(server.chain().lock().unwrap().dr(), &[false; 32][..]);
}

#[test]
fn bypass_scan() {
    let server = TestServer::start(Chain::new());
    let mut client = server.client();

    client
        .shift_bits(&[false, true, true, false, false], &[false; 5])
        .unwrap();
    {
        let chain = server.chain();
        let chain = chain.lock().unwrap();
        assert_eq!(chain.state(), TapState::ShiftIr);
        assert_eq!(chain.ir(), &IR_CAPTURE[..]);
    }

    let tdo = client.shift(32, &[0x00; 4], &[0xff; 4]).unwrap();
    assert_eq!(&tdo[..], &[0xd1, 0xff, 0xff, 0xff]);

    // Update-IR with all ones selects BYPASS, then count the devices
    client
        .shift_bits(&[true, true, true, false, false], &[true; 5])
        .unwrap();
    assert_eq!(
        server.chain().lock().unwrap().instruction(),
        Instruction::Bypass
    );
    let mut tdi = vec![true];
    tdi.extend([false; 15]);
    let tdo = client.shift_bits(&[false; 16], &tdi).unwrap();
    // The first bit is the captured bypass content, the marker follows one edge later
    let delay = tdo.iter().rposition(|&bit| bit).unwrap();
    assert_eq!(delay, 1, "one device in the chain");
}

#[test]
fn empty_shift_is_answered_with_nothing() {
    let server = TestServer::start(Chain::new());
    let mut client = server.client();

    let tdo = client.shift(0, &[], &[]).unwrap();
    assert!(tdo.is_empty());
    assert_eq!(server.chain().lock().unwrap().state(), TapState::Reset);

    // The connection is still in sync
    assert_eq!(client.set_tck(25).unwrap(), 25);
}

#[test]
fn odd_bit_counts_leave_high_bits_clear() {
    let server = TestServer::start(Chain::new());
    let mut client = server.client();

    // TDO is pulled up outside of the shift states
    let tdo = client.shift(11, &[0xff, 0x07], &[0x00, 0x00]).unwrap();
    assert_eq!(&tdo[..], &[0xff, 0x07]);
}

#[test]
fn shifts_longer_than_advertised_are_answered() {
    let server = TestServer::start(Chain::new());
    let mut client = server.client();

    // 8200 TCK cycles in Run-Test/Idle, where TDO is pulled up
    let tdo = client.shift(8200, &[0x00; 1025], &[0x00; 1025]).unwrap();
    assert_eq!(tdo.len(), 1025);
    assert!(tdo.iter().all(|&byte| byte == 0xff));
    assert_eq!(server.chain().lock().unwrap().state(), TapState::Idle);

    assert_eq!(client.set_tck(50).unwrap(), 50);
}

#[test]
fn unknown_command_closes_only_that_connection() {
    let server = TestServer::start(Chain::new());

    let mut tcp = TcpStream::connect(server.addr()).unwrap();
    tcp.write_all(b"bogus:").unwrap();
    assert_closed(&mut tcp);

    assert!(server.client().get_info().is_ok());
}

#[test]
fn truncated_shift_leaves_device_untouched() {
    let server = TestServer::start(Chain::new());

    let mut tcp = TcpStream::connect(server.addr()).unwrap();
    tcp.write_all(b"shift:\x10\x00\x00\x00\x00").unwrap();
    tcp.shutdown(std::net::Shutdown::Write).unwrap();
    assert_closed(&mut tcp);

    let mut client = server.client();
    assert_eq!(client.set_tck(10).unwrap(), 10);
    assert_eq!(server.chain().lock().unwrap().state(), TapState::Reset);
}

#[test]
fn connections_share_one_device() {
    let server = TestServer::start(Chain::new());

    {
        let mut first = server.client();
        first.shift_bits(&RESET_TO_IDLE, &[false; 6]).unwrap();
        first
            .shift_bits(&[true, false, false], &[false; 3])
            .unwrap();
    }

    let mut second = server.client();
    let tdo = second.shift(32, &[0x00; 4], &[0x00; 4]).unwrap();
    assert_eq!(bits::to_value(&reversed(&bits::unpack(32, &tdo))), 0x0364_c093);
}

#[test]
fn persistent_registers_keep_writes() {
    let chain = Chain::builder()
        .update_policy(xvc_sim::chain::UpdatePolicy::Persistent)
        .build();
    let server = TestServer::start(chain);
    let mut client = server.client();

    client.shift_bits(&RESET_TO_IDLE, &[false; 6]).unwrap();
    client
        .shift_bits(&[true, false, false], &[false; 3])
        .unwrap();
    // Shift in 0x12345678, leave through Exit1-DR and Update-DR
    let mut tms = [0x00u8; 4];
    bits::set(&mut tms, 31);
    client.shift(32, &tms, &0x1234_5678u32.to_le_bytes()).unwrap();
    client
        .shift_bits(&[true, true, false, false], &[false; 4])
        .unwrap();

    let tdo = client.shift(32, &[0x00; 4], &[0x00; 4]).unwrap();
    assert_eq!(&tdo[..], &0x1234_5678u32.to_le_bytes());
}

#[test]
fn stopped_server_finishes_open_connections() {
    let server = TestServer::start(Chain::new());
    let mut client = server.client();
    assert_eq!(client.set_tck(100).unwrap(), 100);

    server.stop_accepting();
    let refused = (0..200).any(|_| {
        thread::sleep(Duration::from_millis(10));
        TcpStream::connect(server.addr()).is_err()
    });
    assert!(refused, "listener should be closed");

    assert_eq!(client.set_tck(200).unwrap(), 200);
    assert_eq!(client.get_info().unwrap().max_vector_len(), 1024);
}

fn reversed(bits: &[bool]) -> Vec<bool> {
    bits.iter().rev().copied().collect()
}
