use quest_portal::models::{GateAction, Role, SvgValidationResult};

// --- SvgValidationResult ---

#[test]
fn test_validation_result_recomputes_validity_on_deserialize() {
    // A payload claiming validity while carrying an error must not turn into a valid verdict.
    let result: SvgValidationResult =
        serde_json::from_str(r#"{"is_valid":true,"errors":["forged"],"warnings":[]}"#).unwrap();

    assert!(!result.is_valid());
    assert_eq!(result.errors(), ["forged"]);
    assert_eq!(result.is_valid(), result.errors().is_empty());
}

#[test]
fn test_validation_result_without_errors_is_valid() {
    let result: SvgValidationResult =
        serde_json::from_str(r#"{"is_valid":false,"warnings":["viewBox has zero width or height"]}"#)
            .unwrap();

    assert!(result.is_valid());
    assert!(result.errors().is_empty());
    assert_eq!(result.warnings().len(), 1);
}

#[test]
fn test_validation_result_serialized_shape_survives() {
    let original = SvgValidationResult::new(vec!["SVG contains a <script> tag".to_string()], vec![]);
    let json = serde_json::to_value(&original).unwrap();

    assert_eq!(json["is_valid"], false);
    let parsed: SvgValidationResult = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, original);
}

// --- Session types ---

#[test]
fn test_gate_action_wire_format() {
    let json = serde_json::to_value(GateAction::navigate("/verify-email")).unwrap();
    assert_eq!(json["type"], "navigate");
    assert_eq!(json["to"], "/verify-email");

    let json = serde_json::to_value(GateAction::SignOut).unwrap();
    assert_eq!(json["type"], "sign_out");
}

#[test]
fn test_role_parsing_falls_back_to_student() {
    assert_eq!(Role::from_metadata(Some("admin")), Role::Admin);
    assert_eq!(Role::from_metadata(Some(" parent ")), Role::Parent);
    assert_eq!(Role::from_metadata(Some("principal")), Role::Student);
    assert_eq!(Role::from_metadata(None), Role::Student);
}
