use chrono::NaiveDate;
use smartc::calendar::{Calendar, PooleTable, WINDOW_DAYS};
use smartc::cli::Cli;
use smartc::config::Config;
use smartc::processor::diagnostics::Severity;
use smartc::processor::symbols::EntryKind;
use smartc::processor::{self, Session};
use smartc::writer::portable::{self, END_OF_SECTION};
use std::fs;

fn config() -> Config {
    Config {
        calendar_start: NaiveDate::from_ymd_opt(2024, 3, 1),
        ..Config::default()
    }
}

fn session(source: &str) -> Session {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let mut session = Session::new(Calendar::new(start, &PooleTable));
    processor::compile(source, &mut session);
    session
}

fn messages(session: &Session, severity: Severity) -> Vec<String> {
    session
        .diagnostics
        .iter()
        .filter(|d| d.severity == severity)
        .map(|d| d.message.clone())
        .collect()
}

/// Sections of the runtime stream, header first.
fn sections(source: &str) -> Vec<Vec<String>> {
    let compilation = processor::run(source, &config());
    let project = compilation.project.expect("compiles");
    let mut out = Vec::new();
    portable::write_to(&project, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    let mut lines = text.lines().map(str::to_string);
    let mut sections = vec![vec![lines.next().unwrap()]];
    let mut current = Vec::new();
    for line in lines {
        if line == END_OF_SECTION {
            sections.push(std::mem::take(&mut current));
        } else {
            current.push(line);
        }
    }
    assert!(current.is_empty(), "text after the last section");
    sections
}

#[test]
fn single_lamp_switched_on() {
    let source = "ROOM Kitchen;\nDEVICE LAMP Kitchen.Light A 1;\nPROCEDURE P; SETDEVICE Kitchen.Light ON; END;";
    let s = session(source);
    assert!(messages(&s, Severity::Error).is_empty(), "{:?}", messages(&s, Severity::Error));

    let sections = sections(source);
    assert_eq!(sections.len(), 8);
    assert_eq!(sections[0][0], format!("SmartCode {WINDOW_DAYS} 0 1 0 0 1 0 {}", WINDOW_DAYS + 2));
    assert_eq!(sections[1].len(), WINDOW_DAYS);
    assert_eq!(sections[3], vec!["1 6 12 -1 -1 00:00:00:00:00:00:00:00-00 Kitchen.Light"]);
    // SetDeviceState device 0, ON, no colour, no loop, no delay, 12 hours
    assert_eq!(sections[6], vec!["1 7 P", "2 0 1 0 0 0 43200"]);
}

#[test]
fn if_else_skips_over_each_branch() {
    let source = "ROOM Kitchen;\nDEVICE LAMP Kitchen.Light A 1;\n\
                  PROCEDURE P;\n  IF FALSE THEN SETDEVICE Kitchen.Light OFF; ELSE SETDEVICE Kitchen.Light ON; ENDIF;\nEND;";
    let sections = sections(source);
    let procedure = &sections[6];
    assert_eq!(
        procedure,
        &vec![
            "5 20 P",
            "23 0",
            "28 9",
            "2 0 0 0 0 0 0",
            "26 7",
            "2 0 1 0 0 0 43200",
        ]
    );

    // each skip equals the words actually emitted between jump and target
    let words = |line: &str| line.split(' ').count() as i64;
    assert_eq!(words(&procedure[3]) + words(&procedure[4]), 9);
    assert_eq!(words(&procedure[5]), 7);
}

#[test]
fn forward_references_resolve_on_the_second_pass() {
    let s = session(
        "ROOM Hall;\n\
         DEVICE LAMP Hall.Light B 3 OFFPROCEDURE LightsOut ONPROCEDURE Welcome;\n\
         PROCEDURE Welcome; CALL LightsOut; END;\n\
         PROCEDURE LightsOut; SETDEVICE Hall.Light OFF; END;",
    );
    assert!(messages(&s, Severity::Error).is_empty(), "{:?}", messages(&s, Severity::Error));
}

#[test]
fn duplicates_are_reported_once_each() {
    let test_cases = vec![
        ("ROOM Hall;\nROOM Hall;", "room 'Hall' already declared on line 1"),
        ("INT n = 0;\nBOOL n = TRUE;", "variable 'n' already declared on line 1"),
        (
            "ROOM Hall;\nDEVICE LAMP Hall.Light A 1;\nDEVICE LAMP Hall.Light A 2;",
            "device 'Hall.Light' already declared on line 2",
        ),
    ];
    for (source, expected) in test_cases {
        let s = session(source);
        assert_eq!(messages(&s, Severity::Error), vec![expected.to_string()], "{source}");
    }
}

#[test]
fn only_unreferenced_names_are_warned_about() {
    let s = session(
        "ROOM Hall;\nPROCEDURE Noop; END;\n\
         HOUSECODE Ground A OFFPROCEDURE Noop ONPROCEDURE Noop;\n\
         ENUM Mode (Home, Away);\nINT idle = 0;\nINT busy = 0;\n\
         DEVICE SENSOR Hall.Motion A 1 ONPROCEDURE Bump;\n\
         PROCEDURE Bump; busy++; END;\n\
         DAY 31/03/2024 BST;",
    );
    assert!(messages(&s, Severity::Error).is_empty(), "{:?}", messages(&s, Severity::Error));
    assert_eq!(messages(&s, Severity::Warning), vec!["'idle' not used"]);
}

#[test]
fn entry_numbers_follow_declaration_order_per_kind() {
    let s = session(
        "ROOM Hall, Den;\nINT a = 0;\nPROCEDURE One; END;\nBOOL b = TRUE;\n\
         TIMEOUT T1 00:01;\nPROCEDURE Two; END;\nINT c = 1;\nTIMEOUT T2 00:02;",
    );
    let order = |kind| -> Vec<(String, usize)> {
        s.symbols
            .entries(kind)
            .map(|sym| (sym.name.clone(), sym.entry))
            .collect()
    };
    let named = |pairs: &[(&str, usize)]| pairs.iter().map(|&(n, e)| (n.to_string(), e)).collect::<Vec<_>>();

    assert_eq!(order(EntryKind::Variable), named(&[("a", 0), ("b", 1), ("c", 2)]));
    assert_eq!(order(EntryKind::Procedure), named(&[("One", 0), ("Two", 1)]));
    assert_eq!(order(EntryKind::Timeout), named(&[("T1", 0), ("T2", 1)]));
    assert_eq!(order(EntryKind::Room), named(&[("Hall", 0), ("Den", 1)]));

    let s = session("DEVICE LAMP Garage.Door C 1;\nROOM Garage;\nDEVICE LAMP Garage.Bench C 2;");
    assert!(messages(&s, Severity::Error).is_empty(), "{:?}", messages(&s, Severity::Error));
    let devices: Vec<_> = s
        .symbols
        .entries(EntryKind::Device)
        .map(|sym| (sym.name.clone(), sym.entry))
        .collect();
    assert_eq!(devices, named(&[("Door", 0), ("Bench", 1)]));
}

#[test]
fn device_declared_ahead_of_its_room_is_written_first() {
    let sections = sections("DEVICE LAMP Garage.Door C 1;\nROOM Garage;\nDEVICE LAMP Garage.Bench C 2;");
    assert_eq!(
        sections[3],
        vec![
            "1 2 12 -1 -1 00:00:00:00:00:00:00:00-00 Garage.Door",
            "1 2 28 -1 -1 00:00:00:00:00:00:00:00-00 Garage.Bench",
        ]
    );
}

#[test]
fn errors_leave_no_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("broken.rules");
    fs::write(&source, "PROCEDURE Main; count = 1; END;").unwrap();
    let output = dir.path().join("broken.smt");

    let args = Cli {
        source,
        output: Some(output.clone()),
        config: None,
        listing: None,
    };
    let err = smartc::compile_file(&args).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<smartc::Error>(),
        Some(smartc::Error::CompilationFailed { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn writes_stream_and_listing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("home.rules");
    fs::write(
        &source,
        "RULES Home;\n\
         ROOM Lounge;\n\
         DEVICE HUELAMP Lounge.Spot C \"00:17:88:01:00:bd:c7:b9-0b\";\n\
         DEVICE LAMP Lounge.Standard C 2;\n\
         TIMEOUT Settle 00:20 OFFPROCEDURE Dim;\n\
         PROCEDURE Dim; SETDEVICE Lounge.LAMP DIM8, gold, COLOURLOOP DURATION 01:00; END;\n\
         PROCEDURE Evening; RESET Settle; END;\n\
         TIMER \"Evenings\";\n\
           SEQUENCE \"Sunset\" SUNSET WORKING;\n\
             EVENT -00:15 Evening;\n\
         END;\n\
         DAY 31/03/2024 BST;\nDAY 27/10/2024 GMT;\n\
         END.",
    )
    .unwrap();
    let config_path = dir.path().join("smartc.json");
    fs::write(&config_path, r#"{ "calendar_start": "2024-03-01" }"#).unwrap();
    let listing = dir.path().join("home.json");

    let args = Cli {
        source: source.clone(),
        output: None,
        config: Some(config_path),
        listing: Some(listing.clone()),
    };
    smartc::compile_file(&args).unwrap();

    let stream = fs::read_to_string(source.with_extension("smt")).unwrap();
    assert!(stream.starts_with(&format!("SmartCode {WINDOW_DAYS} 0 2 0 1 2 1 ")));
    assert!(stream.contains("\n3 2 -1 -1 -1 00:17:88:01:00:bd:c7:b9-0b Lounge.Spot\n"));
    assert!(stream.contains("\n1 Evenings\n1 -2 128 Sunset\n1 -900\n"));
    assert!(stream.contains("\n1200 0 Settle\n"));
    // both lamps, DIM8, gold, looping, one hour
    assert!(stream.contains("\n2 14 Dim\n2 0 9 16766720 1 0 3600\n2 1 9 16766720 1 0 3600\n"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(listing).unwrap()).unwrap();
    assert_eq!(json["timers"][0]["sequences"][0]["events"][0]["offset"], -900);
    assert_eq!(json["procedures"][1]["instructions"][0]["opcode"], "ResetTimeout");
}
