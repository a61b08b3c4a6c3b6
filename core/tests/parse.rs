use std::collections::HashMap;

use cmdbind_core::{
    Cli, CliOptions, EnumTable, FieldSchema, FieldType, ParseError, Record, RecordSchema,
    SchemaError, Value,
};
use serde::Deserialize;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn server_schema() -> RecordSchema {
    RecordSchema::new()
        .with_field(FieldSchema::int("count").short('c'))
        .with_field(FieldSchema::bool("verbose").short('v').global())
        .with_field(FieldSchema::list("tags", FieldType::String).short('t'))
        .with_field(FieldSchema::new("small", FieldType::Int(8)))
        .with_field(FieldSchema::array("pair", FieldType::Uint(16), 2))
        .with_field(FieldSchema::enumeration("level", "Level").default_value("info"))
        .with_field(FieldSchema::group(
            "db",
            RecordSchema::new()
                .with_field(FieldSchema::string("host").default_value("localhost"))
                .with_field(FieldSchema::uint("port").default_value("5432")),
        ))
        .with_field(FieldSchema::command(
            "serve",
            RecordSchema::new()
                .with_field(FieldSchema::string("bind").required())
                .with_field(FieldSchema::list("roots", FieldType::String).positional()),
        ))
        .with_field(FieldSchema::command(
            "copy",
            RecordSchema::new()
                .with_field(FieldSchema::string("from").positional().required())
                .with_field(FieldSchema::string("to").positional()),
        ))
}

fn cli_with(options: CliOptions) -> Cli {
    let mut cli = Cli::new(options);
    cli.register_enum(EnumTable::new("Level", [("debug", 0), ("info", 1), ("warn", 2)]));
    cli.add_command("app", &server_schema()).unwrap();
    cli
}

fn new_cli() -> Cli {
    cli_with(CliOptions::default())
}

fn parse(cli: &mut Cli, args: &[&str]) -> Result<(), ParseError> {
    cli.parse_with_env(args, &env(&[]))
}

fn record(cli: &Cli) -> &Record {
    cli.record("app").unwrap()
}

fn sub<'r>(record: &'r Record, name: &str) -> Option<&'r Record> {
    record.field(name).and_then(Value::present).and_then(Value::as_record)
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

#[test]
fn long_short_and_composite_forms_agree() {
    let forms: [&[&str]; 4] = [
        &["app", "--count", "42"],
        &["app", "--count=42"],
        &["app", "-c", "42"],
        &["app", "-c=42"],
    ];
    for args in forms {
        let mut cli = new_cli();
        parse(&mut cli, args).unwrap();
        assert_eq!(record(&cli).field("count"), Some(&Value::Int(42)), "{args:?}");
    }
}

#[test]
fn negative_numbers_are_values() {
    let mut cli = new_cli();
    parse(&mut cli, &["app", "--count", "-5"]).unwrap();
    assert_eq!(record(&cli).field("count"), Some(&Value::Int(-5)));
}

#[test]
fn bool_flags_take_no_separate_value() {
    let mut cli = new_cli();
    parse(&mut cli, &["app", "-v"]).unwrap();
    assert_eq!(record(&cli).field("verbose"), Some(&Value::Bool(true)));

    let mut cli = new_cli();
    parse(&mut cli, &["app", "--verbose=false"]).unwrap();
    assert_eq!(record(&cli).field("verbose"), Some(&Value::Bool(false)));

    let mut cli = new_cli();
    let err = parse(&mut cli, &["app", "--verbose=maybe"]).unwrap_err();
    assert!(matches!(err, ParseError::InvalidValue { ref value, .. } if value == "maybe"));
}

#[test]
fn collection_flags_accumulate() {
    let mut cli = new_cli();
    parse(&mut cli, &["app", "--tags", "a", "-t", "b", "--tags=c"]).unwrap();
    assert_eq!(strings(record(&cli).field("tags")), vec!["a", "b", "c"]);

    let mut cli = new_cli();
    parse(&mut cli, &["app", "--tags", "a", "b", "--count", "1"]).unwrap();
    assert_eq!(strings(record(&cli).field("tags")), vec!["a", "b"]);

    let mut cli = new_cli();
    parse(&mut cli, &["app", "-t", "a", "serve", "--bind", "x"]).unwrap();
    assert_eq!(strings(record(&cli).field("tags")), vec!["a"]);
    let chain: Vec<&str> = cli.execution_chain().iter().map(|l| l.path.as_str()).collect();
    assert_eq!(chain, vec!["app", "app serve"]);
}

#[test]
fn unknown_and_malformed_flags() {
    let mut cli = new_cli();
    assert_eq!(
        parse(&mut cli, &["app", "--nope"]),
        Err(ParseError::NoSuchFlag("--nope".into()))
    );
    assert!(matches!(
        parse(&mut cli, &["app", "---count"]),
        Err(ParseError::InvalidFlag(_))
    ));
}

#[test]
fn missing_flag_value_is_reported() {
    let mut cli = new_cli();
    let err = parse(&mut cli, &["app", "--count"]).unwrap_err();
    assert!(matches!(err, ParseError::InvalidValue { ref flag, .. } if flag == "--count"));

    let err = parse(&mut cli, &["app", "--count", "--verbose"]).unwrap_err();
    assert!(matches!(err, ParseError::InvalidValue { ref value, .. } if value == "--verbose"));
}

#[test]
fn integer_width_is_enforced() {
    let mut cli = new_cli();
    parse(&mut cli, &["app", "--small", "-128"]).unwrap();
    assert_eq!(record(&cli).field("small"), Some(&Value::Int(-128)));

    let err = parse(&mut cli, &["app", "--small", "300"]).unwrap_err();
    assert!(matches!(err, ParseError::InvalidValue { ref flag, .. } if flag == "--small"));
}

#[test]
fn fixed_arrays_reject_extra_values() {
    let mut cli = new_cli();
    parse(&mut cli, &["app", "--pair", "1", "2"]).unwrap();
    assert_eq!(
        record(&cli).field("pair"),
        Some(&Value::List(vec![Value::Uint(1), Value::Uint(2)]))
    );

    assert_eq!(
        parse(&mut cli, &["app", "--pair", "1", "2", "3"]),
        Err(ParseError::ArrayOverCapacity {
            flag: "--pair".into(),
            capacity: 2
        })
    );
}

#[test]
fn enum_values_ignore_case() {
    let mut cli = new_cli();
    parse(&mut cli, &["app", "--level", "Warn"]).unwrap();
    assert_eq!(record(&cli).field("level"), Some(&Value::Int(2)));

    let err = parse(&mut cli, &["app", "--level", "loud"]).unwrap_err();
    assert!(matches!(err, ParseError::InvalidValue { ref value, .. } if value == "loud"));
}

// ---------------------------------------------------------------------------
// Argument groups, env and defaults
// ---------------------------------------------------------------------------

#[test]
fn group_fields_use_prefixed_names() {
    let mut cli = new_cli();
    parse(&mut cli, &["app", "--db.host", "example.org"]).unwrap();
    let db = record(&cli).field("db").and_then(Value::as_record).unwrap();
    assert_eq!(db.field("host"), Some(&Value::Str("example.org".into())));
    assert_eq!(db.field("port"), Some(&Value::Uint(5432)));
}

#[test]
fn environment_beats_defaults_and_loses_to_argv() {
    let mut cli = new_cli();
    let vars = env(&[("DB_HOST", "db.internal"), ("LEVEL", "debug"), ("TAGS", "x 'y z'")]);
    cli.parse_with_env(&["app", "--level", "warn"], &vars).unwrap();

    let record = record(&cli);
    let db = record.field("db").and_then(Value::as_record).unwrap();
    assert_eq!(db.field("host"), Some(&Value::Str("db.internal".into())));
    assert_eq!(record.field("level"), Some(&Value::Int(2)));
    assert_eq!(strings(record.field("tags")), vec!["x", "y z"]);
}

#[test]
fn environment_satisfies_required() {
    let mut cli = new_cli();
    cli.parse_with_env(&["app", "serve"], &env(&[("BIND", "0.0.0.0:80")]))
        .unwrap();
    let serve = sub(record(&cli), "serve").unwrap();
    assert_eq!(serve.field("bind"), Some(&Value::Str("0.0.0.0:80".into())));
}

#[test]
fn invalid_default_is_a_schema_error() {
    let mut cli = Cli::default();
    let schema = RecordSchema::new().with_field(FieldSchema::uint("port").default_value("http"));
    assert!(matches!(
        cli.add_command("app", &schema),
        Err(SchemaError::InvalidDefault { .. })
    ));
}

// ---------------------------------------------------------------------------
// Subcommands and positionals
// ---------------------------------------------------------------------------

#[test]
fn subcommand_builds_execution_chain() {
    let mut cli = new_cli();
    parse(&mut cli, &["app", "--count", "1", "serve", "--bind", ":8080", "a", "b"]).unwrap();

    let paths: Vec<_> = cli
        .execution_chain()
        .iter()
        .map(|link| link.path.as_str())
        .collect();
    assert_eq!(paths, vec!["app", "app serve"]);

    let serve = sub(record(&cli), "serve").unwrap();
    assert_eq!(serve.field("bind"), Some(&Value::Str(":8080".into())));
    assert_eq!(strings(serve.field("roots")), vec!["a", "b"]);
    assert!(sub(record(&cli), "copy").is_none());
}

#[test]
fn unknown_subcommand_is_not_found() {
    let mut cli = new_cli();
    assert_eq!(
        parse(&mut cli, &["app", "deploy"]),
        Err(ParseError::CommandNotFound("deploy".into()))
    );
}

#[test]
fn required_argument_is_checked_on_final_command() {
    let mut cli = new_cli();
    assert_eq!(
        parse(&mut cli, &["app", "--count", "7", "serve"]),
        Err(ParseError::RequiredNotSet("--bind".into()))
    );
    // Earlier tokens stay bound, the missing field stays zero.
    assert_eq!(record(&cli).field("count"), Some(&Value::Int(7)));
    let serve = sub(record(&cli), "serve").unwrap();
    assert_eq!(serve.field("bind"), Some(&Value::Str(String::new())));

    let mut cli = new_cli();
    assert_eq!(
        parse(&mut cli, &["app", "copy"]),
        Err(ParseError::RequiredNotSet("FROM".into()))
    );
}

#[test]
fn scalar_positionals_fill_in_order() {
    let mut cli = new_cli();
    parse(&mut cli, &["app", "copy", "a.txt", "b.txt"]).unwrap();
    let copy = sub(record(&cli), "copy").unwrap();
    assert_eq!(copy.field("from"), Some(&Value::Str("a.txt".into())));
    assert_eq!(copy.field("to"), Some(&Value::Str("b.txt".into())));

    assert_eq!(
        parse(&mut cli, &["app", "copy", "a", "b", "c"]),
        Err(ParseError::TooManyPositionalArguments("c".into()))
    );
}

#[test]
fn separator_ends_flag_parsing() {
    let mut cli = new_cli();
    parse(&mut cli, &["app", "copy", "--", "--from", "-v"]).unwrap();
    let copy = sub(record(&cli), "copy").unwrap();
    assert_eq!(copy.field("from"), Some(&Value::Str("--from".into())));
    assert_eq!(copy.field("to"), Some(&Value::Str("-v".into())));
}

#[test]
fn separator_disables_subcommands() {
    let mut cli = new_cli();
    assert_eq!(
        parse(&mut cli, &["app", "--", "serve"]),
        Err(ParseError::TooManyPositionalArguments("serve".into()))
    );
}

// ---------------------------------------------------------------------------
// Globals
// ---------------------------------------------------------------------------

#[test]
fn global_flags_reach_descendants_when_enabled() {
    let mut cli = cli_with(CliOptions {
        globals_enabled: true,
        ..CliOptions::default()
    });
    parse(&mut cli, &["app", "copy", "-v", "a"]).unwrap();
    assert_eq!(record(&cli).field("verbose"), Some(&Value::Bool(true)));

    let mut cli = new_cli();
    assert_eq!(
        parse(&mut cli, &["app", "copy", "-v", "a"]),
        Err(ParseError::NoSuchFlag("-v".into()))
    );
}

#[test]
fn colliding_globals_are_rejected() {
    let schema = RecordSchema::new()
        .with_field(FieldSchema::bool("debug").global())
        .with_field(FieldSchema::command(
            "run",
            RecordSchema::new().with_field(FieldSchema::string("debug").global()),
        ));
    let mut cli = Cli::new(CliOptions {
        globals_enabled: true,
        ..CliOptions::default()
    });
    assert!(matches!(
        cli.add_command("app", &schema),
        Err(SchemaError::GlobalCollision(_))
    ));
}

// ---------------------------------------------------------------------------
// Re-parsing
// ---------------------------------------------------------------------------

#[test]
fn reparsing_is_idempotent() {
    let mut cli = new_cli();
    let args = ["app", "--tags", "a", "b", "serve", "--bind", "x", "r1"];
    parse(&mut cli, &args).unwrap();
    let first = record(&cli).clone();
    parse(&mut cli, &args).unwrap();
    assert_eq!(record(&cli), &first);
}

#[test]
fn reparsing_empty_argv_restores_defaults() {
    let schema = RecordSchema::new()
        .with_field(FieldSchema::int("n").default_value("1"))
        .with_field(FieldSchema::list("tags", FieldType::String).default_value("a b"));
    let mut cli = Cli::default();
    cli.add_command("app", &schema).unwrap();

    parse(&mut cli, &["app"]).unwrap();
    let defaults = record(&cli).clone();
    assert_eq!(defaults.field("n"), Some(&Value::Int(1)));

    parse(&mut cli, &["app", "--n", "5", "--tags", "z"]).unwrap();
    assert_eq!(record(&cli).field("n"), Some(&Value::Int(5)));

    parse(&mut cli, &["app"]).unwrap();
    assert_eq!(record(&cli), &defaults);
    parse(&mut cli, &["app"]).unwrap();
    assert_eq!(record(&cli), &defaults);
}

#[test]
fn record_deserializes_into_typed_struct() {
    #[derive(Debug, Deserialize)]
    struct Db {
        host: String,
        port: u16,
    }
    #[derive(Debug, Deserialize)]
    struct App {
        count: i64,
        tags: Vec<String>,
        db: Db,
        serve: Option<serde_json::Value>,
    }

    let mut cli = new_cli();
    parse(&mut cli, &["app", "-c", "3", "-t", "x"]).unwrap();
    let app: App = record(&cli).deserialize().unwrap();
    assert_eq!(app.count, 3);
    assert_eq!(app.tags, vec!["x"]);
    assert_eq!(app.db.host, "localhost");
    assert_eq!(app.db.port, 5432);
    assert!(app.serve.is_none());
}
