//! Integration tests for the de-identification engine with synthetic notes

use deid::config::{load_config, load_default_config};
use deid::deidentification::{BatchItem, DeidEngine, Selection};
use deid::domain::Person;
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;

fn engine() -> DeidEngine {
    DeidEngine::from_default_config().expect("built-in configuration builds")
}

fn jan_jansen() -> Person {
    Person::new().with_first_names(["Jan"]).with_surname("Jansen")
}

fn redact(engine: &DeidEngine, text: &str) -> String {
    engine
        .deidentify(text, None, &Selection::All)
        .unwrap()
        .deidentified_text
        .unwrap()
}

#[test]
fn test_patient_mentions_redact_to_one_placeholder() {
    let result = engine()
        .deidentify(
            "Jan Jansen is hier. Jansen kwam terug.",
            Some(&jan_jansen()),
            &Selection::All,
        )
        .unwrap();

    assert_eq!(
        result.deidentified_text.as_deref(),
        Some("<PATIENT> is hier. <PATIENT> kwam terug.")
    );
    assert_eq!(result.annotations.len(), 2);
    assert_eq!(result.annotations[0].text, "Jan Jansen");
    assert_eq!(result.annotations[1].text, "Jansen");
    assert!(result.annotations.iter().all(|a| a.tag == "patient"));
}

fn deidentify_patient(engine: &DeidEngine, text: &str, patient: &Person) -> String {
    engine
        .deidentify(text, Some(patient), &Selection::All)
        .unwrap()
        .deidentified_text
        .unwrap()
}

#[test]
fn test_interfix_surname_gets_one_patient_placeholder() {
    let engine = engine();
    let patient = Person::new()
        .with_first_names(["Jan"])
        .with_surname("van der Heide");

    assert_eq!(
        deidentify_patient(&engine, "Jan van der Heide kwam. Van der Heide belde.", &patient),
        "<PATIENT> kwam. <PATIENT> belde."
    );
    assert_eq!(deidentify_patient(&engine, "van der Heide", &patient), "<PATIENT>");
}

#[test]
fn test_initials_with_interfix_surname_are_the_patient() {
    let patient = Person::new()
        .with_initials("J.P.")
        .with_surname("van der Heide");

    assert_eq!(
        deidentify_patient(&engine(), "J.P. van der Heide", &patient),
        "<PATIENT>"
    );
    assert_eq!(
        deidentify_patient(&engine(), "Gesprek met J.P. van der Heide gehad.", &patient),
        "Gesprek met <PATIENT> gehad."
    );
}

#[test]
fn test_double_barrelled_name_with_patient_part_is_one_person() {
    let patient = Person::new().with_surname("Jansen");
    let result = engine()
        .deidentify("Jansen-de Vries", Some(&patient), &Selection::All)
        .unwrap();

    assert_eq!(result.deidentified_text.as_deref(), Some("<PERSOON-1>"));
    assert_eq!(result.annotations.len(), 1);
    assert_eq!(result.annotations[0].text, "Jansen-de Vries");
    assert_eq!(result.annotations[0].tag, "persoon");
}

#[test]
fn test_without_patient_the_same_name_is_not_canonical() {
    let result = engine()
        .deidentify("Jan Jansen is hier.", None, &Selection::All)
        .unwrap();

    let text = result.deidentified_text.unwrap();
    assert!(!text.contains("<PATIENT>"));
    assert!(!text.contains("Jansen"));
}

#[test]
fn test_numeric_date_is_redacted() {
    let text = redact(&engine(), "Controle op 12-03-2021.");
    assert_eq!(text, "Controle op <DATUM-1>.");
}

#[test]
fn test_valid_bsn_is_redacted_and_invalid_is_kept() {
    let engine = engine();

    let valid = redact(&engine, "BSN 111222333 bekend.");
    assert!(valid.contains("<BSN-1>"));
    assert!(!valid.contains("111222333"));

    let invalid = redact(&engine, "Nummer 111222334 bekend.");
    assert!(invalid.contains("111222334"));
}

#[test]
fn test_email_wins_over_embedded_url() {
    let result = engine()
        .deidentify("Mail naar j.jansen@example.nl graag.", None, &Selection::All)
        .unwrap();

    let text = result.deidentified_text.unwrap();
    assert!(text.contains("<EMAIL-1>"));
    assert!(!text.contains("example.nl"));
    assert_eq!(result.tag_counts.get("email"), Some(&1));
    assert!(!result.tag_counts.contains_key("url"));
}

#[test]
fn test_place_lookup_and_numbering() {
    let text = redact(
        &engine(),
        "Verhuisd uit Utrecht naar Breda, daarna terug naar Utrecht.",
    );
    assert_eq!(
        text,
        "Verhuisd uit <LOCATIE-1> naar <LOCATIE-2>, daarna terug naar <LOCATIE-1>."
    );
}

#[test]
fn test_text_without_phi_is_unchanged() {
    let source = "Geen bijzonderheden, beleid ongewijzigd.";
    let result = engine().deidentify(source, None, &Selection::All).unwrap();

    assert!(!result.has_annotations());
    assert_eq!(result.deidentified_text.as_deref(), Some(source));
}

#[test]
fn test_empty_text() {
    let result = engine().deidentify("", None, &Selection::All).unwrap();
    assert!(!result.has_annotations());
    assert_eq!(result.deidentified_text.as_deref(), Some(""));
}

#[test]
fn test_result_serializes_to_json() {
    let result = engine()
        .deidentify("Jan Jansen belde.", Some(&jan_jansen()), &Selection::All)
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["annotations"][0]["tag"], "patient");
    assert_eq!(json["annotations"][0]["start_char"], 0);
    assert_eq!(json["tag_counts"]["patient"], 1);
    assert!(json["id"].is_string());
}

#[test]
fn test_batch_keeps_order_and_counts() {
    let items = vec![
        BatchItem::new("1.txt", "Jan Jansen belde.").with_person(jan_jansen()),
        BatchItem::new("2.txt", "Opname in Utrecht."),
        BatchItem::new("3.txt", "Geen bijzonderheden."),
    ];

    let (results, report) = engine().deidentify_batch(items, &Selection::All);

    assert_eq!(results.len(), 3);
    assert_eq!(report.total_documents, 3);
    assert_eq!(report.stats.documents_without_annotations, 1);
    assert_eq!(report.annotations_by_tag.get("patient"), Some(&1));
    assert_eq!(report.annotations_by_tag.get("locatie"), Some(&1));
    let names: Vec<&str> = report.documents.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["1.txt", "2.txt", "3.txt"]);
}

#[test]
fn test_concurrent_calls_share_one_engine() {
    let engine = Arc::new(engine());
    let person = jan_jansen();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let engine = Arc::clone(&engine);
            let person = person.clone();
            scope.spawn(move || {
                for _ in 0..10 {
                    let result = engine
                        .deidentify(
                            "Jan Jansen is hier. Jansen kwam terug.",
                            Some(&person),
                            &Selection::All,
                        )
                        .unwrap();
                    assert_eq!(
                        result.deidentified_text.as_deref(),
                        Some("<PATIENT> is hier. <PATIENT> kwam terug.")
                    );
                }
            });
        }
    });
}

#[test]
fn test_lookup_update_while_engine_is_shared() {
    let engine = Arc::new(engine());
    let before = redact(&engine, "Zij woont in Zeist.");
    assert!(before.contains("Zeist"));

    let version = engine
        .update_lookups(|registry| {
            if let Some(places) = registry.trie_mut("places") {
                places.insert(&["Zeist"]);
            }
            Ok(())
        })
        .unwrap();

    assert_eq!(version, 2);
    assert_eq!(redact(&engine, "Zij woont in Zeist."), "Zij woont in <LOCATIE-1>.");
}

#[test]
fn test_lookup_lists_from_directory() {
    let dir = TempDir::new().unwrap();
    let lists = dir.path().join("lists").join("places");
    std::fs::create_dir_all(lists.join("lst_extra")).unwrap();
    std::fs::write(lists.join("items.txt"), "Zeist\nBunnik\nDoorn\n").unwrap();
    std::fs::write(lists.join("exceptions.txt"), "Doorn\n").unwrap();
    std::fs::write(lists.join("lst_extra").join("items.txt"), "Houten\n").unwrap();

    let config_path = dir.path().join("deid.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    file.write_all(
        br#"
[lookups.places]
structure = "trie"
path = "lists/places"

[[processors]]
name = "places"
kind = "multi_token_lookup"
group = "locations"
args = { lookup = "places", tag = "locatie" }

[[processors]]
name = "redactor"
kind = "redactor"
"#,
    )
    .unwrap();

    let engine = DeidEngine::new(load_config(&config_path).unwrap()).unwrap();
    let text = redact(&engine, "Van Zeist via Houten naar Doorn.");
    assert_eq!(text, "Van <LOCATIE-1> via <LOCATIE-2> naar Doorn.");
}

#[test]
fn test_reload_lookups_picks_up_file_changes() {
    let dir = TempDir::new().unwrap();
    let list = dir.path().join("places.txt");
    std::fs::write(&list, "Zeist\n").unwrap();

    let mut config = load_default_config().unwrap();
    config.lookups.get_mut("places").unwrap().path = Some(list.clone());

    let engine = DeidEngine::new(config).unwrap();
    assert!(redact(&engine, "Naar Bunnik.").contains("Bunnik"));

    std::fs::write(&list, "Zeist\nBunnik\n").unwrap();
    assert_eq!(engine.reload_lookups().unwrap(), 2);
    assert_eq!(redact(&engine, "Naar Bunnik."), "Naar <LOCATIE-1>.");
}
