// Integration tests for server reply handling
//
// These tests verify reply parsing, audio payload decoding and end-marker detection.

use base64::Engine;
use interview_session::channel::{Reply, REPLY_AUDIO_MIME};
use interview_session::SessionError;

#[test]
fn test_parse_text_and_audio() {
    let audio = base64::engine::general_purpose::STANDARD.encode(b"mp3 bytes");
    let raw = format!(r#"{{"text":"Hello","audio":"{}"}}"#, audio);

    let reply = Reply::parse(&raw).unwrap();

    assert_eq!(reply.text(), Some("Hello"));
    assert!(reply.has_audio());

    let clip = reply.decode_audio().unwrap().expect("audio should be present");
    assert_eq!(clip.mime_type, REPLY_AUDIO_MIME);
    assert_eq!(clip.data, b"mp3 bytes".to_vec());
}

#[test]
fn test_parse_missing_fields() {
    let reply = Reply::parse("{}").unwrap();

    assert_eq!(reply.text(), None);
    assert!(!reply.has_audio());
    assert_eq!(reply.decode_audio().unwrap(), None);
}

#[test]
fn test_empty_text_counts_as_absent() {
    let reply = Reply::parse(r#"{"text":"","audio":""}"#).unwrap();

    assert_eq!(reply.text(), None);
    assert!(!reply.has_audio());
    assert_eq!(reply.decode_audio().unwrap(), None);
}

#[test]
fn test_parse_rejects_malformed_json() {
    for raw in ["not json", "", r#"{"text": 42}"#, r#"["text"]"#] {
        let err = Reply::parse(raw).unwrap_err();
        assert!(
            matches!(err, SessionError::MalformedReply(_)),
            "{:?} should be malformed, got {:?}",
            raw,
            err
        );
    }
}

#[test]
fn test_invalid_audio_payload() {
    let reply = Reply::parse(r#"{"text":"Hi","audio":"***"}"#).unwrap();

    assert!(reply.has_audio());
    assert!(matches!(
        reply.decode_audio(),
        Err(SessionError::MalformedReply(_))
    ));
}

#[test]
fn test_end_marker_is_case_insensitive() {
    let reply = Reply::parse(r#"{"text":"Thanks! The INTERVIEW Complete message."}"#).unwrap();

    assert!(reply.signals_end("interview complete"));
    assert!(!reply.signals_end("goodbye"));
}

#[test]
fn test_end_marker_needs_text() {
    let reply = Reply::parse("{}").unwrap();
    assert!(!reply.signals_end("interview complete"));

    let reply = Reply::parse(r#"{"text":"anything"}"#).unwrap();
    assert!(!reply.signals_end(""), "an empty marker never matches");
}
