use olos_communication::firmware::grbl::response_parser::*;
use olos_core::ProtocolError;

fn tokens() -> ProtocolTokens {
    ProtocolTokens::default()
}

#[test]
fn test_ack_is_exact() {
    assert_eq!(classify("ok", &tokens()), Ok(LineKind::Ack));
    assert_eq!(classify("okay", &tokens()), Ok(LineKind::Message));
}

#[test]
fn test_frames() {
    assert_eq!(
        classify("<Idle|MPos:0.000,0.000,0.000>", &tokens()),
        Ok(LineKind::StatusReport)
    );
    assert_eq!(
        classify("[GC:G0 G54 G17 G21 G90 G94 M5 M9 T0 F0 S0]", &tokens()),
        Ok(LineKind::ParserState)
    );
}

#[test]
fn test_unterminated_frames_are_malformed() {
    assert_eq!(
        classify("<Idle|MPos:0.000", &tokens()),
        Err(ProtocolError::MalformedFrame {
            line: "<Idle|MPos:0.000".to_string()
        })
    );
    assert!(classify("[MSG:Reset to", &tokens()).is_err());
}

#[test]
fn test_tool_change_tokens() {
    assert_eq!(classify("TOCK", &tokens()), Ok(LineKind::ToolChangeComplete));
    assert_eq!(
        classify("T2 TOCK done", &tokens()),
        Ok(LineKind::ToolChangeComplete)
    );
    assert_eq!(classify("TOCE", &tokens()), Ok(LineKind::ToolChangeFailed));
}

#[test]
fn test_soft_limit_is_exact() {
    assert_eq!(classify("ALARM:2", &tokens()), Ok(LineKind::SoftLimit));
    assert_eq!(classify("ALARM:1", &tokens()), Ok(LineKind::Message));
}

#[test]
fn test_custom_tokens() {
    let tokens = ProtocolTokens {
        ack: "OK".to_string(),
        tool_change_success: "[TC:OK]".to_string(),
        ..ProtocolTokens::default()
    };
    assert_eq!(classify("OK", &tokens), Ok(LineKind::Ack));
    assert_eq!(classify("ok", &tokens), Ok(LineKind::Message));
    // Frames are recognized before tokens.
    assert_eq!(classify("[TC:OK]", &tokens), Ok(LineKind::ParserState));
}

#[test]
fn test_other_lines() {
    assert_eq!(
        classify("Grbl 1.1h ['$' for help]", &tokens()),
        Ok(LineKind::Message)
    );
    assert_eq!(classify("error:20", &tokens()), Ok(LineKind::Message));
}
