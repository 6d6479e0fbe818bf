// End-to-end session flows against a scripted engine: connect, run, iterate,
// rerun, and the per-directory config/ignore plumbing.
use std::fs;

use depotbridge::api::{
    EnvStore, IgnoreFile, MergeStatus, ScriptEvent, ScriptedEngine, Session, Severity,
    VC_CONFIG, VC_PORT, VC_USER,
};

fn record(entries: &[(&str, &str)]) -> Vec<ScriptEvent> {
    let mut events = vec![ScriptEvent::Record];
    for (key, value) in entries {
        events.push(ScriptEvent::KeyValue(key.to_string(), value.to_string()));
    }
    events
}

#[test]
fn tagged_listing_end_to_end() {
    let engine = ScriptedEngine::new().script(
        "fstat",
        vec![
            ScriptEvent::Record,
            ScriptEvent::KeyValue("depotFile".to_string(), "//depot/main/a.c".to_string()),
            ScriptEvent::KeyValue("headRev".to_string(), "4".to_string()),
            ScriptEvent::Record,
            ScriptEvent::KeyValue("depotFile".to_string(), "//depot/main/b.c".to_string()),
            ScriptEvent::KeyValue("headRev".to_string(), "11".to_string()),
        ],
    );
    let mut session = Session::new("depot:1666", "mei", "", "mei-ws", engine);

    let ok = session
        .run_command("fstat", 1, true, &["//depot/main/...".to_string()])
        .expect("run");
    assert!(ok);

    let ctx = session.find_context(1).expect("context");
    assert_eq!(ctx.tagged_count(), 2);

    let mut cursor = ctx.tagged_output();
    let first = cursor.next_record().expect("first record");
    assert_eq!(first.get("depotFile"), Some("//depot/main/a.c"));
    let second = cursor.next_record().expect("second record");
    assert_eq!(second.get("headRev"), Some("11"));
    assert!(cursor.next_record().is_none());
    // Exhaustion is permanent.
    assert!(cursor.next_record().is_none());
}

#[test]
fn entry_walk_tracks_record_boundaries() {
    let engine = ScriptedEngine::new().script(
        "clients",
        vec![
            ScriptEvent::Record,
            ScriptEvent::KeyValue("client".to_string(), "mei-ws".to_string()),
            ScriptEvent::KeyValue("Root".to_string(), "/home/mei/ws".to_string()),
            ScriptEvent::Record,
            ScriptEvent::KeyValue("client".to_string(), "build-ws".to_string()),
        ],
    );
    let mut session = Session::new("depot:1666", "mei", "", "", engine);
    session.run_command("clients", 2, true, &[]).expect("run");

    let mut cursor = session.find_context(2).expect("ctx").tagged_output();
    // Entries are unreachable until a record is current.
    assert!(cursor.next_entry().is_none());

    cursor.next_record().expect("record one");
    assert_eq!(cursor.next_entry(), Some(("client", "mei-ws")));
    assert_eq!(cursor.next_entry(), Some(("Root", "/home/mei/ws")));
    assert!(cursor.next_entry().is_none());

    cursor.next_record().expect("record two");
    assert_eq!(cursor.next_entry(), Some(("client", "build-ws")));
    assert!(cursor.next_entry().is_none());
}

#[test]
fn cursor_survives_rerun_of_same_command_id() {
    let engine = ScriptedEngine::new()
        .script("files", record(&[("old", "1")]))
        .script("files", record(&[("new", "2")]));
    let mut session = Session::new("depot:1666", "mei", "", "", engine);
    session.run_command("files", 4, true, &[]).expect("first");

    let mut cursor = session.find_context(4).expect("ctx").tagged_output();
    session.run_command("files", 4, true, &[]).expect("second");

    // The old cursor still walks the snapshot it was created over.
    let stale = cursor.next_record().expect("snapshot record");
    assert_eq!(stale.get("old"), Some("1"));

    let mut fresh = session.find_context(4).expect("ctx").tagged_output();
    assert_eq!(fresh.next_record().expect("fresh").get("new"), Some("2"));
}

#[test]
fn text_and_error_channels_accumulate_per_command() {
    let engine = ScriptedEngine::new()
        .script(
            "print",
            vec![
                ScriptEvent::Text(b"line one\n".to_vec()),
                ScriptEvent::Text(b"line two\n".to_vec()),
            ],
        )
        .script(
            "sync",
            vec![ScriptEvent::Error {
                severity: Severity::Failed,
                code: 6001,
                text: "path not under client root".to_string(),
            }],
        );
    let mut session = Session::new("depot:1666", "mei", "", "mei-ws", engine);

    assert!(session.run_command("print", 10, false, &[]).expect("print"));
    assert!(!session.run_command("sync", 11, true, &[]).expect("sync"));

    let print_ctx = session.find_context(10).expect("print ctx");
    assert_eq!(&print_ctx.text_results()[..], b"line one\nline two\n");
    assert!(print_ctx.error_results().is_empty());

    let sync_ctx = session.find_context(11).expect("sync ctx");
    assert_eq!(sync_ctx.error_results()[0].text, "path not under client root");
    assert_eq!(sync_ctx.max_severity(), Severity::Failed);
}

#[test]
fn resolve_handler_decides_merges() {
    let engine = ScriptedEngine::new().script(
        "resolve",
        vec![
            ScriptEvent::Resolve(Default::default()),
            ScriptEvent::Finish(true),
        ],
    );
    let mut session = Session::new("depot:1666", "mei", "", "mei-ws", engine);
    session.handlers_mut().resolve = Some(Box::new(|_, _| MergeStatus::Theirs));
    session.run_command("resolve", 20, true, &[]).expect("run");
    assert_eq!(
        session.engine().resolve_answers(),
        &[MergeStatus::Theirs]
    );
}

#[test]
fn session_from_path_reads_config_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let project = temp.path().join("src").join("app");
    fs::create_dir_all(&project).expect("mkdir");
    fs::write(
        temp.path().join(".vcconfig"),
        "VCPORT=cfg:1666\nVCUSER=cfg-user\nVCCHARSET=utf8\n",
    )
    .expect("write config");

    let mut env = EnvStore::with_file(temp.path().join("env.json"));
    env.update(VC_CONFIG, ".vcconfig");
    env.update(VC_PORT, "env:1666");

    // Config discovered from an inner directory wins over the env tier.
    let session = Session::from_path(&project, &env, ScriptedEngine::new());
    assert_eq!(session.endpoint(), "cfg:1666");
    assert_eq!(session.user(), "cfg-user");
    assert_eq!(session.charset(), "utf8");

    let plain = env.resolve(None, VC_PORT);
    assert_eq!(plain.as_deref(), Some("env:1666"));
    assert_eq!(env.resolve(None, VC_USER), None);
}

#[test]
fn ignore_rules_apply_relative_to_their_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join(".vcignore"),
        "# build output\n*.o\nbuild/**\n!build/keep.txt\n",
    )
    .expect("write ignore");

    let ignore = IgnoreFile::load(&temp.path().join(".vcignore")).expect("load");
    assert_eq!(ignore.verdict(&temp.path().join("main.o")), Some(true));
    assert_eq!(ignore.verdict(&temp.path().join("build/out/a.bin")), Some(true));
    assert_eq!(ignore.verdict(&temp.path().join("build/keep.txt")), Some(false));
    assert_eq!(ignore.verdict(&temp.path().join("main.c")), None);
}
