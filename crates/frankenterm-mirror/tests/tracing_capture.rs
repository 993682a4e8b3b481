//! Diagnostics reach a `tracing` subscriber with their structured fields.

use std::sync::{Arc, Mutex};

use frankenterm_mirror::{Emulator, Parser, TerminalCapabilities};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};

/// A captured event: level, message, and the other fields as `name=value`.
#[derive(Debug, Clone)]
struct CapturedEvent {
    level: Level,
    message: String,
    fields: Vec<String>,
}

/// A tracing Layer that records every event.
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

/// Visitor that splits the message from the other fields.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<String>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_owned();
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

fn capture<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        events: events.clone(),
    });
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

#[test]
fn malformed_osc_logs_cant_parse() {
    let events = capture(|| {
        let mut parser = Parser::new();
        assert!(parser.process(b"\x1b]m;?\x1b\\").is_empty());
    });
    let warning = events
        .iter()
        .find(|e| e.level == Level::WARN && e.message.contains("can't parse"))
        .expect("warning for malformed OSC");
    assert!(
        warning.fields.iter().any(|f| f.starts_with("ps=")),
        "{:?}",
        warning.fields
    );
}

#[test]
fn restore_without_save_is_info() {
    let events = capture(|| {
        let mut emu = Emulator::new(20, 5, 0);
        emu.handle_stream(b"\x1b[2;3H\x1b8");
        assert_eq!((emu.cursor_row(), emu.cursor_col()), (1, 2));
    });
    assert!(events.iter().any(|e| e.level == Level::INFO));
    assert!(!events.iter().any(|e| e.level == Level::WARN));
}

#[test]
fn well_formed_output_is_quiet() {
    let events = capture(|| {
        let mut emu = Emulator::new(40, 10, 0);
        emu.handle_stream(b"\x1b[1;31mhello\x1b[0m\r\n\x1b[2;5H\x1b[K");
    });
    assert!(
        !events.iter().any(|e| e.level <= Level::WARN),
        "{events:?}"
    );
}

#[test]
fn capability_lookup_logs_at_debug() {
    let events = capture(|| {
        TerminalCapabilities::lookup("xterm-256color").unwrap();
    });
    assert!(
        events
            .iter()
            .any(|e| e.level == Level::DEBUG && e.fields.iter().any(|f| f == "bce=true"))
    );
}
