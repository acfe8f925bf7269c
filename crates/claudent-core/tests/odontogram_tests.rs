//! Odontogram editing integration tests.

use std::sync::Arc;

use claudent_core::audit::AuditLog;
use claudent_core::clinic::Clinic;
use claudent_core::models::{ConditionCode, DentitionType, SurfaceName, Tool, ToothNumber};
use claudent_core::odontogram::{OdontogramEditor, ToolOutcome};
use claudent_core::store::{CollectionPath, Database, DocumentData, DocumentStore, SetMode};

fn tooth(n: u8) -> ToothNumber {
    ToothNumber::new(n).unwrap()
}

fn make_clinic() -> (Clinic, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let audit = AuditLog::new(db.clone(), 10);
    (Clinic::new(db.clone(), audit, "dr@clinic.com"), db)
}

#[test]
fn test_adult_chart_save_and_reload_findings() {
    let (clinic, _db) = make_clinic();
    let odontogram = clinic
        .create_odontogram("patient-1", DentitionType::Adult, None)
        .unwrap();

    let mut editor = clinic.open_odontogram("patient-1", &odontogram.id).unwrap();
    editor.select_tool(ConditionCode::Caries.into());
    editor.apply_tool_to_tooth(tooth(16)).unwrap();
    editor.select_tool(ConditionCode::MissingCaries.into());
    editor.apply_tool_to_tooth(tooth(46)).unwrap();
    clinic.save_odontogram(&mut editor).unwrap();

    let reloaded = clinic.open_odontogram("patient-1", &odontogram.id).unwrap();
    let findings: Vec<String> = reloaded
        .compute_findings_summary()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(findings, vec!["Tooth 16: Caries", "Tooth 46: Missing (caries)"]);
}

#[test]
fn test_free_text_survives_reload() {
    let (clinic, _db) = make_clinic();
    let odontogram = clinic
        .create_odontogram("patient-1", DentitionType::Mixed, Some("Review"))
        .unwrap();

    let mut editor = clinic.open_odontogram("patient-1", &odontogram.id).unwrap();
    editor.select_tool(ConditionCode::RootCanal.into());
    editor.apply_tool_to_tooth(tooth(36)).unwrap();
    editor.select_tool(Tool::Condition(ConditionCode::Other));
    assert_eq!(
        editor.apply_tool_to_tooth(tooth(36)).unwrap(),
        ToolOutcome::AwaitingFreeText(tooth(36))
    );
    editor.confirm_free_text("Vertical fracture").unwrap();
    editor.set_surface(tooth(36), SurfaceName::Occlusal, "Temporary filling");
    editor.set_general_notes("Refer to endodontist");
    clinic.save_odontogram(&mut editor).unwrap();

    let reloaded = clinic.open_odontogram("patient-1", &odontogram.id).unwrap();
    assert_eq!(reloaded.general_notes(), "Refer to endodontist");
    let findings = reloaded.compute_findings_summary();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].text, "Root canal treatment, Vertical fracture");
    assert_eq!(
        reloaded
            .tooth_state(tooth(36))
            .surfaces
            .get(&SurfaceName::Occlusal)
            .map(String::as_str),
        Some("Temporary filling")
    );
}

#[test]
fn test_legacy_document_is_normalised_on_load() {
    let (_clinic, db) = make_clinic();
    let path = CollectionPath::odontograms("patient-1").doc("legacy");
    let body = serde_json::json!({
        "name": "Old chart",
        "createdAt": "2023-04-01T10:00:00Z",
        "dentitionType": "adulto",
        "teeth": {
            "11": { "estados": [], "superficies": {} },
            "21": { "estados": ["0", "1"], "superficies": {} }
        },
        "notes": ""
    });
    let data: DocumentData = serde_json::from_value(body).unwrap();
    db.set(&path, data, SetMode::Overwrite).unwrap();

    let editor = OdontogramEditor::load(db.as_ref(), "patient-1", "legacy").unwrap();
    assert_eq!(editor.odontogram().dentition_type, DentitionType::Adult);
    assert!(editor.tooth_state(tooth(11)).is_sound_only());
    let upper_left = editor.tooth_state(tooth(21));
    assert!(upper_left.has(ConditionCode::Caries));
    assert!(!upper_left.has(ConditionCode::Sound));
}

#[test]
fn test_failed_save_keeps_working_copy() {
    let (clinic, db) = make_clinic();
    let odontogram = clinic
        .create_odontogram("patient-1", DentitionType::Adult, None)
        .unwrap();
    let mut editor = clinic.open_odontogram("patient-1", &odontogram.id).unwrap();
    editor.select_tool(ConditionCode::Caries.into());
    editor.apply_tool_to_tooth(tooth(16)).unwrap();

    // Deleted elsewhere before the save lands
    db.delete(&CollectionPath::odontograms("patient-1").doc(odontogram.id.as_str()))
        .unwrap();
    assert!(clinic.save_odontogram(&mut editor).is_err());
    assert!(!editor.is_saving());
    assert!(editor.tooth_state(tooth(16)).has(ConditionCode::Caries));
}

#[test]
fn test_last_write_wins_between_editors() {
    let (clinic, _db) = make_clinic();
    let odontogram = clinic
        .create_odontogram("patient-1", DentitionType::Adult, None)
        .unwrap();

    let mut first = clinic.open_odontogram("patient-1", &odontogram.id).unwrap();
    let mut second = clinic.open_odontogram("patient-1", &odontogram.id).unwrap();

    first.select_tool(ConditionCode::Caries.into());
    first.apply_tool_to_tooth(tooth(11)).unwrap();
    second.select_tool(ConditionCode::Trauma.into());
    second.apply_tool_to_tooth(tooth(21)).unwrap();

    clinic.save_odontogram(&mut first).unwrap();
    clinic.save_odontogram(&mut second).unwrap();

    let reloaded = clinic.open_odontogram("patient-1", &odontogram.id).unwrap();
    assert!(!reloaded.teeth().contains_key(&tooth(11)));
    assert!(reloaded.tooth_state(tooth(21)).has(ConditionCode::Trauma));
}
