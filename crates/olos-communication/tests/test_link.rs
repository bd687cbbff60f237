use olos_communication::{SerialLink, VirtualController};
use olos_core::{ConnectError, ReadError, WriteError};
use std::time::Duration;

const PORT: &str = "/dev/ttyACM0";
const TIMEOUT: Duration = Duration::from_millis(20);

fn connected_link() -> (VirtualController, SerialLink) {
    let controller = VirtualController::new(PORT);
    controller.set_ack_commands(false);
    let mut link = SerialLink::new(Box::new(controller.driver()), "\n");
    link.connect(Some(PORT), 115200, TIMEOUT).unwrap();
    controller.take_sent_lines();
    (controller, link)
}

#[test]
fn test_connect_sends_handshake() {
    let controller = VirtualController::new(PORT);
    let mut link = SerialLink::new(Box::new(controller.driver()), "\n");

    link.connect(Some(PORT), 115200, TIMEOUT).unwrap();

    assert!(link.is_connected());
    assert_eq!(link.port_name(), Some(PORT));
    assert_eq!(controller.sent_lines(), vec!["?"]);
    // The status reply is consumed; the ack for the query's line follows.
    assert_eq!(link.try_read_line(), Ok(Some("ok".to_string())));
    assert_eq!(link.try_read_line(), Ok(None));
}

#[test]
fn test_auto_discovery_finds_controller() {
    let controller = VirtualController::new(PORT);
    let mut link = SerialLink::new(Box::new(controller.driver()), "\n");

    link.connect(None, 115200, TIMEOUT).unwrap();

    assert_eq!(link.port_name(), Some(PORT));
    assert_eq!(controller.open_count(), 1);
}

#[test]
fn test_silent_device_is_not_a_controller() {
    let controller = VirtualController::new(PORT);
    controller.set_status_reply(None);
    let mut link = SerialLink::new(Box::new(controller.driver()), "\n");

    assert_eq!(
        link.connect(None, 115200, TIMEOUT),
        Err(ConnectError::NoDeviceFound)
    );
    assert!(!link.is_connected());
}

#[test]
fn test_unreachable_port() {
    let controller = VirtualController::new(PORT);
    controller.set_offline(true);
    let mut link = SerialLink::new(Box::new(controller.driver()), "\n");

    let result = link.connect(Some(PORT), 115200, TIMEOUT);
    assert!(matches!(result, Err(ConnectError::Io { .. })));
}

#[test]
fn test_write_appends_newline() {
    let controller = VirtualController::new(PORT);
    let mut link = SerialLink::new(Box::new(controller.driver()), "\r\n");
    link.connect(Some(PORT), 115200, TIMEOUT).unwrap();
    controller.take_sent_lines();

    link.write("G0 X1").unwrap();
    link.write("G0 Y1").unwrap();

    assert_eq!(controller.sent_lines(), vec!["G0 X1", "G0 Y1"]);
}

#[test]
fn test_read_assembles_split_lines() {
    let (controller, mut link) = connected_link();

    controller.push_bytes(b"o");
    assert_eq!(link.try_read_line(), Ok(None));
    controller.push_bytes(b"k\r\n<Idle|MPos:0.000,0.000,0.000>\r\n");

    assert_eq!(link.try_read_line(), Ok(Some("ok".to_string())));
    assert_eq!(
        link.try_read_line(),
        Ok(Some("<Idle|MPos:0.000,0.000,0.000>".to_string()))
    );
    assert_eq!(link.try_read_line(), Ok(None));
}

#[test]
fn test_undecodable_line_is_dropped() {
    let (controller, mut link) = connected_link();

    controller.push_bytes(&[0xff, 0xfe, b'\n']);
    controller.push_line("ok");

    assert_eq!(link.try_read_line(), Err(ReadError::Decode { len: 2 }));
    assert_eq!(link.try_read_line(), Ok(Some("ok".to_string())));
    assert!(link.is_connected());
}

#[test]
fn test_read_line_swallows_errors() {
    let (controller, mut link) = connected_link();
    controller.push_bytes(&[0xc3, b'\n']);
    assert_eq!(link.read_line(), None);
}

#[test]
fn test_write_timeout_disconnects() {
    let (controller, mut link) = connected_link();
    controller.set_fail_writes(true);

    assert_eq!(link.write("G0 X1"), Err(WriteError::WriteTimeout));
    assert!(!link.is_connected());
    assert_eq!(link.write("G0 X1"), Err(WriteError::LinkDown));
}

#[test]
fn test_unplugged_device_disconnects_on_read() {
    let (controller, mut link) = connected_link();
    controller.set_offline(true);

    assert!(matches!(link.try_read_line(), Err(ReadError::Io { .. })));
    assert!(!link.is_connected());
    assert_eq!(link.try_read_line(), Ok(None));
}

#[test]
fn test_disconnect_is_idempotent() {
    let (_controller, mut link) = connected_link();
    link.disconnect();
    link.disconnect();
    assert!(!link.is_connected());
    assert_eq!(link.port_name(), None);
}
