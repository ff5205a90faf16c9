use storefront_api::stripe::webhook::{
    Event, parse_signature_header, sign_payload, verify_signature,
};

const SECRET: &str = "whsec_test_secret";

fn header_for(payload: &[u8], timestamp: i64) -> String {
    format!("t={},v1={}", timestamp, sign_payload(payload, timestamp, SECRET))
}

#[test]
fn valid_signature_verifies() {
    let payload = br#"{"type":"checkout.session.completed"}"#;
    let header = header_for(payload, 1717171717);
    assert!(verify_signature(payload, &header, SECRET));
}

#[test]
fn tampered_payload_is_rejected() {
    let payload = br#"{"amount_total":4700}"#;
    let header = header_for(payload, 1717171717);
    let tampered = br#"{"amount_total":9900}"#;
    assert!(!verify_signature(tampered, &header, SECRET));
}

#[test]
fn wrong_secret_is_rejected() {
    let payload = b"payload";
    let header = header_for(payload, 1);
    assert!(!verify_signature(payload, &header, "whsec_other"));
}

#[test]
fn any_matching_v1_candidate_passes() {
    let payload = b"payload";
    let good = sign_payload(payload, 9, SECRET);
    let header = format!("t=9,v1=deadbeef,v1={good}");
    assert!(verify_signature(payload, &header, SECRET));
}

#[test]
fn malformed_headers_are_rejected() {
    assert!(!verify_signature(b"x", "", SECRET));
    assert!(!verify_signature(b"x", "t=notanumber,v1=aa", SECRET));
    assert!(!verify_signature(b"x", "v1=aa", SECRET));
    assert!(parse_signature_header("t=5").is_none());

    let parsed = parse_signature_header("t=5, v1=aa, v0=bb").unwrap();
    assert_eq!(parsed.timestamp, 5);
    assert_eq!(parsed.v1, vec!["aa".to_string()]);
}

#[test]
fn session_buyer_id_prefers_client_reference_id() {
    let body = br#"{
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_1",
            "amount_total": 4700,
            "client_reference_id": "11111111-2222-3333-4444-555555555555",
            "metadata": { "userId": "99999999-9999-9999-9999-999999999999" }
        }}
    }"#;
    let event: Event = serde_json::from_slice(body).unwrap();
    assert_eq!(event.kind, "checkout.session.completed");
    assert_eq!(
        event.data.object.buyer_id(),
        Some("11111111-2222-3333-4444-555555555555")
    );
}

#[test]
fn session_buyer_id_falls_back_to_metadata() {
    let body = br#"{
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_2",
            "amount_total": 1000,
            "client_reference_id": null,
            "metadata": { "userId": "99999999-9999-9999-9999-999999999999" }
        }}
    }"#;
    let event: Event = serde_json::from_slice(body).unwrap();
    assert_eq!(
        event.data.object.buyer_id(),
        Some("99999999-9999-9999-9999-999999999999")
    );
}
