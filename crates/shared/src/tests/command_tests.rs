use super::*;

fn add(line: &str) -> NewAppointment {
    match parse_command(line).expect("valid ADD") {
        Command::Add(new) => new,
        other => panic!("expected ADD, got {other:?}"),
    }
}

#[test]
fn parses_add_without_description() {
    let new = add(r#"ADD 2025-09-26 10:00 60 "Meeting""#);
    assert_eq!(new.date, "2025-09-26");
    assert_eq!(new.time, "10:00");
    assert_eq!(new.duration, 60);
    assert_eq!(new.title, "Meeting");
    assert_eq!(new.description, "");
}

#[test]
fn parses_add_with_description_and_lowercase_verb() {
    let new = add(r#"  add 2025-09-26 10:00 45 "Project sync"   "Room 4, bring slides" "#);
    assert_eq!(new.title, "Project sync");
    assert_eq!(new.description, "Room 4, bring slides");
    assert_eq!(new.duration, 45);
}

#[test]
fn add_requires_quoted_non_empty_title() {
    for line in [
        "ADD 2025-09-26 10:00 60 Meeting",
        r#"ADD 2025-09-26 10:00 60 """#,
        r#"ADD 2025-09-26 10:00 "Meeting""#,
        r#"ADD 2025-09-26 10:00 60 "Meeting" "a" "b""#,
        r#"ADD 2025-09-26 10:00 60 "Meeting"x"#,
        r#"ADD 2025-09-26 10:00 60 "Meeting"#,
    ] {
        assert_eq!(
            parse_command(line),
            Err(CommandError::invalid_format(Verb::Add)),
            "{line}"
        );
    }
}

#[test]
fn add_rejects_non_integer_duration() {
    for duration in ["60min", "-5", "1.5", "99999999999"] {
        let line = format!(r#"ADD 2025-09-26 10:00 {duration} "Meeting""#);
        assert_eq!(
            parse_command(&line),
            Err(CommandError::InvalidDuration {
                value: duration.to_string()
            })
        );
    }
}

#[test]
fn list_without_argument_or_all_selects_everything() {
    assert_eq!(parse_command("LIST"), Ok(Command::List(ListFilter::All)));
    assert_eq!(parse_command("list all"), Ok(Command::List(ListFilter::All)));
}

#[test]
fn list_date_filter_is_structural() {
    let expected = CalendarDate {
        year: 2025,
        month: 9,
        day: 26,
    };
    assert_eq!(
        parse_command("LIST 2025-9-26"),
        Ok(Command::List(ListFilter::On(expected)))
    );
    assert_eq!(
        parse_command("LIST 26/09/2025"),
        Ok(Command::List(ListFilter::On(expected)))
    );
}

#[test]
fn malformed_list_filter_is_not_an_error() {
    assert_eq!(
        parse_command("LIST next-week"),
        Ok(Command::List(ListFilter::Malformed("next-week".into())))
    );
    assert_eq!(
        parse_command("LIST 2025-09-26 extra"),
        Err(CommandError::invalid_format(Verb::List))
    );
}

#[test]
fn parses_update_and_keeps_field_name_verbatim() {
    assert_eq!(
        parse_command(r#"Update 42 Title "Updated Meeting Title""#),
        Ok(Command::Update {
            id: AppointmentId(42),
            field: "Title".into(),
            value: "Updated Meeting Title".into(),
        })
    );
    assert_eq!(
        parse_command(r#"UPDATE 1 colour "red""#),
        Ok(Command::Update {
            id: AppointmentId(1),
            field: "colour".into(),
            value: "red".into(),
        })
    );
}

#[test]
fn update_rejects_bad_shapes() {
    for line in [
        r#"UPDATE x title "X""#,
        "UPDATE 1 title X",
        r#"UPDATE 1 "X""#,
        r#"UPDATE +1 title "X""#,
    ] {
        assert_eq!(
            parse_command(line),
            Err(CommandError::invalid_format(Verb::Update)),
            "{line}"
        );
    }
}

#[test]
fn delete_requires_numeric_id() {
    assert_eq!(
        parse_command("DELETE 7"),
        Ok(Command::Delete {
            id: AppointmentId(7)
        })
    );
    assert_eq!(
        parse_command("DELETE abc"),
        Err(CommandError::invalid_format(Verb::Delete))
    );
    assert_eq!(
        parse_command("DELETE"),
        Err(CommandError::invalid_format(Verb::Delete))
    );
}

#[test]
fn unknown_verb_is_reported_verbatim() {
    let err = parse_command("SCHEDULE tomorrow").expect_err("unknown verb");
    assert_eq!(
        err,
        CommandError::UnknownCommand {
            verb: "SCHEDULE".into()
        }
    );
    assert_eq!(err.to_string(), "Unknown command: SCHEDULE");
    assert_eq!(parse_command("   "), Err(CommandError::Empty));
}

#[test]
fn format_errors_carry_usage() {
    let err = parse_command("DELETE abc").expect_err("format error");
    assert_eq!(
        err.to_string(),
        "Invalid DELETE command format. Use: DELETE <id>"
    );
}

#[test]
fn display_produces_a_line_the_grammar_accepts() {
    let command = parse_command(r#"add 2025-09-26 10:00 60 "Meeting" "Agenda""#).expect("add");
    let line = command.to_string();
    assert_eq!(command.verb(), Verb::Add);
    assert_eq!(line, r#"ADD 2025-09-26 10:00 60 "Meeting" "Agenda""#);
    assert_eq!(line.parse::<Command>(), Ok(command));
}
