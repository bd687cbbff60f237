use olos_communication::firmware::grbl::status_parser::*;
use olos_core::{Axes, BufferState, FeedAndSpeed, MachineEvent, Overrides};
use proptest::prelude::*;

#[test]
fn test_idle_with_position_only() {
    let record = parse_status("<Idle|MPos:1.0,2.0,3.0>");

    assert_eq!(record.state.as_deref(), Some("Idle"));
    assert_eq!(record.machine_position, Some(Axes::new(1.0, 2.0, 3.0)));
    assert!(record.work_coordinate_offset.is_none());
    assert!(record.buffer_state.is_none());
    assert!(record.feed_and_speed.is_none());
    assert!(record.overrides.is_none());
    assert!(record.machine_tool.is_none());
}

#[test]
fn test_run_report_serializes_expected_fields() {
    let record = parse_status("<Run|MPos:10.000,0.000,-5.000|FS:500,1000>");
    let json = serde_json::to_value(&record).unwrap();

    assert_eq!(json["state"], "Run");
    assert_eq!(json["machine_position"]["x"], 10.0);
    assert_eq!(json["machine_position"]["y"], 0.0);
    assert_eq!(json["machine_position"]["z"], -5.0);
    assert_eq!(json["feed_and_speed"]["feed_rate"], 500.0);
    assert_eq!(json["feed_and_speed"]["speed"], 1000.0);
    assert!(json["overrides"].is_object());
    assert!(json["overrides"]["feed"].is_null());
}

#[test]
fn test_full_report() {
    let record = parse_status(
        "<Hold:0|MPos:5.000,6.000,7.000|Bf:15,128|FS:250.5,12000|WCO:1.000,1.000,1.000|Ov:100,50,120|T:3>",
    );

    assert_eq!(record.state.as_deref(), Some("Hold"));
    assert_eq!(
        record.buffer_state,
        Some(BufferState {
            commands_queued: 15.0,
            buffer_length: 128.0
        })
    );
    assert_eq!(
        record.feed_and_speed,
        Some(FeedAndSpeed {
            feed_rate: 250.5,
            speed: 12000.0
        })
    );
    assert_eq!(
        record.overrides,
        Some(Overrides {
            feed: 100.0,
            rapids: 50.0,
            spindle: 120.0
        })
    );
    assert_eq!(record.machine_tool, Some(3.0));
    assert_eq!(record.work_position(), Some(Axes::new(4.0, 5.0, 6.0)));
}

#[test]
fn test_homing_placeholder() {
    let record = parse_status("<Home>");
    assert!(record.is_state("Home"));
    assert!(record.machine_position.is_none());
}

#[test]
fn test_homing_event_keeps_position_object() {
    let event = MachineEvent::MachineStatus(parse_status("<Home>"));
    let json = serde_json::to_value(&event).unwrap();

    assert_eq!(json["type"], "machine_status");
    assert_eq!(json["state"], "Home");
    assert!(json["machine_position"].is_object());
    assert!(json["machine_position"]["x"].is_null());
    assert!(json["work_coordinate_offset"]["z"].is_null());
}

#[test]
fn test_not_a_status_report() {
    let record = parse_status("ok");
    assert!(record.state.is_none());
    assert!(record.machine_position.is_none());
}

proptest! {
    #[test]
    fn parse_status_never_panics(line in ".*") {
        let _ = parse_status(&line);
    }

    #[test]
    fn parse_status_never_panics_on_frame_like_input(
        body in "[A-Za-z:|,.0-9<>\\-]{0,80}"
    ) {
        let _ = parse_status(&format!("<{body}>"));
    }

    #[test]
    fn position_round_trips_through_report(
        x in -1000.0f64..1000.0,
        y in -1000.0f64..1000.0,
        z in -1000.0f64..1000.0,
    ) {
        let line = format!("<Idle|MPos:{x:.3},{y:.3},{z:.3}>");
        let position = parse_status(&line).machine_position.unwrap();
        prop_assert!((position.x - x).abs() < 0.001);
        prop_assert!((position.y - y).abs() < 0.001);
        prop_assert!((position.z - z).abs() < 0.001);
    }
}
