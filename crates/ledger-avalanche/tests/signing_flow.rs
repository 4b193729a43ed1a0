//! End-to-end protocol flows against a scripted device.

// Silence unused crate dependency warnings for test binary
use serde as _;
use thiserror as _;
use toml as _;
use tracing as _;
use tracing_subscriber as _;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ledger_avalanche::ledger::Phase;
use ledger_avalanche::ledger::params::{Instruction, MessagePosition, PayloadType};
use ledger_avalanche::ledger::session::SigningSession;
use ledger_avalanche::{
    AppConfig, Connector, Error, ErrorKind, LedgerAvalanche, Result, SigningRequest, StatusWord,
    Transport, VersionInfo,
};

const PREFIX: &str = "m/44'/9000'/0'";

/// Everything the scripted device saw.
#[derive(Debug, Default)]
struct DeviceLog {
    sent: Vec<Vec<u8>>,
    closed: bool,
}

#[derive(Debug)]
struct ScriptedDevice {
    responses: VecDeque<Vec<u8>>,
    log: Rc<RefCell<DeviceLog>>,
    fail_close: bool,
}

impl ScriptedDevice {
    fn new(responses: Vec<Vec<u8>>) -> (Self, Rc<RefCell<DeviceLog>>) {
        let log = Rc::new(RefCell::new(DeviceLog::default()));
        let device = Self {
            responses: responses.into(),
            log: Rc::clone(&log),
            fail_close: false,
        };
        (device, log)
    }

    /// Makes `close` report an error after recording the attempt.
    fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

impl Transport for ScriptedDevice {
    fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        self.log.borrow_mut().sent.push(command.to_vec());
        self.responses
            .pop_front()
            .ok_or_else(|| Error::Transport("device unplugged".to_string()))
    }

    fn close(&mut self) -> Result<()> {
        self.log.borrow_mut().closed = true;
        if self.fail_close {
            return Err(Error::Transport("handle already released".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct SingleDevice(Option<ScriptedDevice>);

impl Connector for SingleDevice {
    type Transport = ScriptedDevice;

    fn connect(&mut self, index: usize) -> Result<ScriptedDevice> {
        if index != 0 {
            return Err(Error::DeviceNotFound);
        }
        self.0.take().ok_or(Error::DeviceNotFound)
    }
}

fn ok(body: &[u8]) -> Vec<u8> {
    status(body, 0x9000)
}

fn status(body: &[u8], code: u16) -> Vec<u8> {
    let mut raw = body.to_vec();
    raw.extend_from_slice(&code.to_be_bytes());
    raw
}

fn signature(n: u8) -> Vec<u8> {
    vec![n; 65]
}

#[test]
fn signs_thousand_byte_message_with_three_paths() {
    let mut responses = vec![ok(&[])];
    responses.extend((0..5).map(|_| ok(&[])));
    responses.extend((1..=3).map(|n| ok(&signature(n))));
    let (mut device, log) = ScriptedDevice::new(responses);

    let request = SigningRequest::new(PREFIX, ["0/0", "0/1", "0/2"], vec![0x42; 1000]);
    let mut session = SigningSession::new(&mut device, 0x80, 250);
    let response = session.sign(&request).unwrap();
    assert_eq!(session.phase(), Phase::Done);

    assert_eq!(response.len(), 3);
    assert_eq!(response.get("0/0"), Some(signature(1).as_slice()));
    assert_eq!(response.get("0/1"), Some(signature(2).as_slice()));
    assert_eq!(response.get("0/2"), Some(signature(3).as_slice()));
    assert!(response.error_message.is_none());

    let log = log.borrow();
    assert_eq!(log.sent.len(), 1 + 5 + 3);

    let init = &log.sent[0];
    assert_eq!(
        &init[..5],
        &[
            0x80,
            Instruction::Sign.code(),
            PayloadType::Init.code(),
            MessagePosition::First.code(),
            13
        ]
    );

    // 1 + 3 * 9 + 1000 = 1028 bytes of upload payload
    let uploads = &log.sent[1..6];
    let lengths: Vec<u8> = uploads.iter().map(|frame| frame[4]).collect();
    assert_eq!(lengths, [250, 250, 250, 250, 28]);
    let tags: Vec<u8> = uploads.iter().map(|frame| frame[2]).collect();
    assert_eq!(tags, [1, 1, 1, 1, 2]);
    assert_eq!(&uploads[0][5..6], &[3]);

    let collects = &log.sent[6..];
    for (frame, suffix) in collects.iter().zip(0u8..) {
        assert_eq!(frame[1], Instruction::SignHash.code());
        assert_eq!(frame[4], 9);
        assert_eq!(frame[5..], [2, 0, 0, 0, 0, 0, 0, 0, suffix]);
    }
    let positions: Vec<u8> = collects.iter().map(|frame| frame[2]).collect();
    assert_eq!(positions, [0x03, 0x03, 0x02]);
}

#[test]
fn change_paths_are_uploaded_but_not_signed() {
    let (device, log) = ScriptedDevice::new(vec![ok(&[]), ok(&[]), ok(&signature(9))]);
    let mut app = LedgerAvalanche::new(device, AppConfig::default()).unwrap();

    let request = SigningRequest::new(PREFIX, ["0/5"], vec![0x01, 0x02])
        .with_change_paths(["1/0", "0/5"]);
    let response = app.sign(&request).unwrap();
    assert_eq!(response.len(), 1);

    let log = log.borrow();
    assert_eq!(log.sent.len(), 3);
    // count, two distinct suffixes, message
    assert_eq!(log.sent[1][4], 1 + 2 * 9 + 2);
    assert_eq!(log.sent[1][5], 2);
    assert_eq!(log.sent[2][2], MessagePosition::Last.code());
}

#[test]
fn failed_collection_returns_nothing() {
    let (device, log) = ScriptedDevice::new(vec![
        ok(&[]),
        ok(&[]),
        ok(&signature(1)),
        status(&[], 0x6986),
    ]);
    let mut app = LedgerAvalanche::new(device, AppConfig::default()).unwrap();

    let request = SigningRequest::new(PREFIX, ["0/0", "0/1", "0/2"], vec![0x00; 10]);
    let err = app.sign(&request).unwrap_err();

    assert!(matches!(err, Error::SigningFailed));
    assert_eq!(err.kind(), ErrorKind::DeviceRejected);
    assert_eq!(log.borrow().sent.len(), 4);
}

#[test]
fn device_lost_during_upload() {
    let (device, log) = ScriptedDevice::new(vec![ok(&[])]);
    let mut app = LedgerAvalanche::new(device, AppConfig::default()).unwrap();

    let request = SigningRequest::new(PREFIX, ["0/0"], vec![0x00; 600]);
    let err = app.sign(&request).unwrap_err();

    assert!(matches!(err, Error::Transport(msg) if msg == "device unplugged"));
    assert_eq!(log.borrow().sent.len(), 2);
}

#[test]
fn device_lost_during_collection_returns_nothing() {
    let (device, log) = ScriptedDevice::new(vec![ok(&[]), ok(&[]), ok(&signature(1))]);
    let mut app = LedgerAvalanche::new(device, AppConfig::default()).unwrap();

    let request = SigningRequest::new(PREFIX, ["0/0", "0/1"], vec![0x00; 10]);
    let result = app.sign(&request);

    assert!(matches!(result, Err(Error::Transport(_))));
    assert_eq!(log.borrow().sent.len(), 4);
}

#[test]
fn rejected_upload_carries_device_message() {
    let (device, _log) =
        ScriptedDevice::new(vec![ok(&[]), status(b"Unexpected number of inputs", 0x6984)]);
    let mut app = LedgerAvalanche::new(device, AppConfig::default()).unwrap();

    let request = SigningRequest::new(PREFIX, ["0/0"], vec![0x00; 4]);
    let err = app.sign(&request).unwrap_err();

    assert_eq!(err.to_string(), "Unexpected number of inputs");
}

#[test]
fn rejected_init_is_command_rejected() {
    let (device, log) = ScriptedDevice::new(vec![status(&[], 0x6985)]);
    let mut app = LedgerAvalanche::new(device, AppConfig::default()).unwrap();

    let request = SigningRequest::new(PREFIX, ["0/0"], vec![0x00; 4]);
    assert!(matches!(app.sign(&request), Err(Error::CommandRejected)));
    assert_eq!(log.borrow().sent.len(), 1);
}

#[test]
fn malformed_suffix_sends_nothing() {
    let (device, log) = ScriptedDevice::new(vec![]);
    let mut app = LedgerAvalanche::new(device, AppConfig::default()).unwrap();

    let request = SigningRequest::new(PREFIX, ["0/0", "m/44'/0"], vec![0x00; 4]);
    let err = app.sign(&request).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(log.borrow().sent.is_empty());
}

#[test]
fn signs_hash_with_each_path() {
    let (device, log) = ScriptedDevice::new(vec![ok(&[]), ok(&signature(1)), ok(&signature(2))]);
    let mut app = LedgerAvalanche::new(device, AppConfig::default()).unwrap();

    let hash = [0x11; 32];
    let response = app.sign_hash(PREFIX, &["0/0", "1/3"], &hash).unwrap();
    assert_eq!(response.len(), 2);

    let log = log.borrow();
    let init = &log.sent[0];
    assert_eq!(init[1], Instruction::SignHash.code());
    assert_eq!(init[2], MessagePosition::First.code());
    assert_eq!(init[4], 13 + 32);
    assert_eq!(&init[18..], &hash);
    assert_eq!(log.sent[1][2], MessagePosition::Next.code());
    assert_eq!(log.sent[2][2], MessagePosition::Last.code());
}

#[test]
fn retrieves_testnet_address() {
    let mut body = vec![33];
    body.extend_from_slice(&[0x03; 33]);
    body.extend_from_slice(&[0xAB; 20]);
    let (device, log) = ScriptedDevice::new(vec![ok(&body)]);
    let mut app = LedgerAvalanche::new(device, AppConfig::default()).unwrap();

    let (public_key, hash) = app.get_pubkey(PREFIX, false, "avax", "testnet").unwrap();
    assert_eq!(public_key.len(), 33);
    assert_eq!(hash, vec![0xAB; 20]);

    let log = log.borrow();
    let frame = &log.sent[0];
    assert_eq!(frame[..4], [0x80, Instruction::GetAddr.code(), 0x00, 0x00]);
    assert_eq!(usize::from(frame[4]), frame.len() - 5);
    assert!(frame.ends_with(&[3, 0x80, 0, 0, 0x2C, 0x80, 0, 0x23, 0x28, 0x80, 0, 0, 0]));
}

#[test]
fn discovery_checks_version() {
    let (device, log) = ScriptedDevice::new(vec![ok(&[0x00, 0x00, 0x06, 0x05])]);
    let mut connector = SingleDevice(Some(device));

    let mut app = LedgerAvalanche::find_app(&mut connector, AppConfig::default()).unwrap();
    assert_eq!(app.last_version(), Some(VersionInfo::new(0, 0, 6, 5)));
    assert!(app.check_version(VersionInfo::new(0, 0, 6, 4)).is_err());

    assert_eq!(app.get_version().unwrap_err().kind(), ErrorKind::Transport);
    app.close().unwrap();
    assert!(log.borrow().closed);
}

#[test]
fn discovery_closes_device_when_app_is_not_open() {
    let (device, log) = ScriptedDevice::new(vec![status(&[], 0x6E00)]);
    let mut connector = SingleDevice(Some(device));

    let err = LedgerAvalanche::find_app(&mut connector, AppConfig::default()).unwrap_err();
    assert!(matches!(err, Error::AppNotOpen));
    assert_eq!(err.to_string(), "are you sure the Avalanche app is open?");
    assert!(log.borrow().closed);
}

#[test]
fn discovery_reports_original_error_when_close_fails() {
    let (device, log) = ScriptedDevice::new(vec![status(&[], 0x6E00)]);
    let mut connector = SingleDevice(Some(device.failing_close()));

    let err = LedgerAvalanche::find_app(&mut connector, AppConfig::default()).unwrap_err();
    assert!(matches!(err, Error::AppNotOpen));
    assert_eq!(err.kind(), ErrorKind::AppNotOpen);
    assert!(log.borrow().closed);
}

#[test]
fn discovery_closes_device_on_old_app() {
    let (device, log) = ScriptedDevice::new(vec![ok(&[0x00, 0x00, 0x05, 0x09])]);
    let mut connector = SingleDevice(Some(device));

    let err = LedgerAvalanche::find_app(&mut connector, AppConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    assert!(log.borrow().closed);
}

#[test]
fn discovery_keeps_other_device_errors() {
    let (device, log) = ScriptedDevice::new(vec![status(&[], 0x6D00)]);
    let mut connector = SingleDevice(Some(device));

    let err = LedgerAvalanche::find_app(&mut connector, AppConfig::default()).unwrap_err();
    assert_eq!(err.status_word(), Some(StatusWord::InsNotSupported));
    assert!(log.borrow().closed);
}

#[test]
fn discovery_uses_configured_device_index() {
    let (device, _log) = ScriptedDevice::new(vec![]);
    let mut connector = SingleDevice(Some(device));
    let config = AppConfig {
        device_index: 1,
        ..AppConfig::default()
    };

    let err = LedgerAvalanche::find_app(&mut connector, config).unwrap_err();
    assert!(matches!(err, Error::DeviceNotFound));
}

#[test]
fn signatures_serialize_as_hex() {
    let (device, _log) = ScriptedDevice::new(vec![ok(&[]), ok(&[]), ok(&[0xDE, 0xAD])]);
    let mut app = LedgerAvalanche::new(device, AppConfig::default()).unwrap();

    let response = app
        .sign(&SigningRequest::new(PREFIX, ["0/0"], vec![0x00]))
        .unwrap();
    let json = serde_json::to_string(&response).unwrap();

    assert_eq!(json, r#"{"error_message":null,"signatures":{"0/0":"0xdead"}}"#);
    assert_eq!(hex::encode(response.get("0/0").unwrap()), "dead");
}
