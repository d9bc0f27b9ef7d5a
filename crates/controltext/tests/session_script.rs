use std::sync::Arc;

use controlplane::Schema;
use controltext::{generate, CapturedLines, Flow, MixerLayout, SessionOptions, TextSession};
use pretty_assertions::assert_eq;

struct Harness {
    schema: Arc<Schema>,
    session: TextSession,
    lines: CapturedLines,
}

impl Harness {
    fn new() -> Self {
        let schema = Arc::new(generate(&MixerLayout::new(2, 2)));
        let lines = CapturedLines::new();
        let session = TextSession::new(Arc::clone(&schema), Arc::new(lines.clone()), SessionOptions::default()).unwrap();
        Self { schema, session, lines }
    }

    fn run(&self, now: u64, line: &str) -> Vec<String> {
        assert_eq!(self.session.handle_line(now, line), Flow::Continue);
        self.lines.take()
    }

    fn tick(&self, now: u64) -> Vec<String> {
        self.schema.manager().tick(now);
        self.lines.take()
    }
}

#[test]
fn test_get_and_set() {
    let h = Harness::new();
    assert_eq!(h.run(0, "/input/1/gain"), vec!["/input/1/gain=0"]);
    assert_eq!(h.run(1, "/input/1/gain=-6.5"), vec!["/input/1/gain=-6.5"]);
    assert_eq!(h.run(2, "/input/1/gain"), vec!["/input/1/gain=-6.5"]);
    assert_eq!(h.run(3, "/output/2/mute=true"), vec!["/output/2/mute=true"]);
}

#[test]
fn test_empty_value_is_ignored() {
    let h = Harness::new();
    assert!(h.run(0, "/input/1/gain=").is_empty());
    assert_eq!(h.run(1, "/input/1/gain"), vec!["/input/1/gain=0"]);
}

#[test]
fn test_strings_are_quoted() {
    let h = Harness::new();
    assert_eq!(h.run(0, "/entity/entity_name"), vec!["/entity/entity_name='Example Mixer'"]);
    assert_eq!(
        h.run(1, "/configuration/object_name='Live \\'A\\''"),
        vec!["/configuration/object_name='Live \\'A\\''"]
    );
    assert_eq!(h.run(2, "/entity/group_name=Stage Left"), vec!["/entity/group_name='Stage Left'"]);
}

#[test]
fn test_regex_get_and_set() {
    let h = Harness::new();
    assert_eq!(h.run(0, "/input/.*/mute"), vec!["/input/1/mute=false", "/input/2/mute=false"]);
    assert_eq!(
        h.run(1, "/(input|output)/2/gain=-3"),
        vec!["/input/2/gain=-3", "/output/2/gain=-3"]
    );
}

#[test]
fn test_describe() {
    let h = Harness::new();
    assert_eq!(
        h.run(0, "?/input/1/gain"),
        vec![
            "?{'/input/1/gain': [{ 'name' : 'gain', 'value' : '0', 'minimum' : '-90', 'maximum' : '10', \
             'default' : '0', 'step' : '1', 'units' : 'dB'}]}"
        ]
    );
    assert_eq!(
        h.run(1, "?/entity/entity_name"),
        vec!["?{'/entity/entity_name':[ { 'value' : 'Example Mixer'} ]}"]
    );
    assert_eq!(
        h.run(2, "?/entity/serial_number"),
        vec!["?{'/entity/serial_number':[ { 'value' : '0000001'} ]}"]
    );
}

#[test]
fn test_subscription_delivers_after_latency() {
    let h = Harness::new();
    assert!(h.run(0, "+/input/1/gain").is_empty());
    assert_eq!(h.run(5, "/input/1/gain=-12"), vec!["/input/1/gain=-12"]);
    assert!(h.tick(20).is_empty());
    assert_eq!(h.tick(40), vec!["/input/1/gain=-12"]);
    assert!(h.tick(80).is_empty());
}

#[test]
fn test_subscription_heartbeat() {
    let h = Harness::new();
    assert!(h.run(0, "+/output/1/mute 30 1000").is_empty());
    assert!(h.tick(500).is_empty());
    assert_eq!(h.tick(1000), vec!["/output/1/mute=false"]);
}

#[test]
fn test_unsubscribe() {
    let h = Harness::new();
    h.run(0, "+/input/1/gain");
    assert_eq!(h.run(1, "-/input/1/gain"), vec!["-/input/1/gain"]);
    h.run(2, "/input/1/gain=-1");
    assert!(h.tick(100).is_empty());
}

#[test]
fn test_regex_set_is_held_until_done() {
    let h = Harness::new();
    h.run(0, "+/input/.*/mute");
    assert_eq!(h.run(10, "/input/.*/mute=1"), vec!["/input/1/mute=true", "/input/2/mute=true"]);

    {
        let _hold = h.schema.manager().hold();
        assert!(h.tick(50).is_empty());
    }
    assert_eq!(h.tick(60), vec!["/input/1/mute=true", "/input/2/mute=true"]);
}

#[test]
fn test_errors_are_reported() {
    let h = Harness::new();
    assert_eq!(h.run(0, "/nope"), vec!["# Error: /nope : address not found: /nope"]);
    assert_eq!(
        h.run(1, "/entity/serial_number=123"),
        vec!["# Error: /entity/serial_number=123 : read only: /entity/serial_number"]
    );
    let out = h.run(2, "/input/1/gain=20");
    assert_eq!(out.len(), 1);
    assert!(out[0].starts_with("# Error: /input/1/gain=20 : "));
    assert_eq!(h.run(3, "/input/1/gain"), vec!["/input/1/gain=0"]);
    assert_eq!(
        h.run(4, "/configuration/object_name='open"),
        vec!["# Error: /configuration/object_name='open : string parse error: unterminated string"]
    );
}

#[test]
fn test_quit_after_script() {
    let h = Harness::new();
    assert_eq!(h.session.handle_line(0, ":exit"), Flow::Quit);
    assert!(h.lines.take().is_empty());
}
