//! Log output: `[Vardr] message` lines by default, or one JSON record per
//! line when structured logging is on. Every JSON record carries `event`
//! (`log` unless the event names its own), `timestamp`, `level`, `target`
//! and `message`, plus the event's fields.

use std::fmt;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, SubscriberBuilder};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;
use vardr_engine::JSON_LOG_FIELDS;

/// Discriminator for records that do not set `event` themselves.
const DEFAULT_EVENT: &str = "log";

pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = builder().with_env_filter(filter);
    if json {
        builder.event_format(JsonFormat).init();
    } else {
        builder.event_format(PlainFormat).init();
    }
}

/// Container logs go to collectors, not terminals.
fn builder() -> SubscriberBuilder {
    tracing_subscriber::fmt().with_ansi(false)
}

/// `[Vardr] message key=value ...`, with the level shown for non-INFO events.
struct PlainFormat;

impl<S, N> FormatEvent<S, N> for PlainFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = *event.metadata().level();
        if level == Level::INFO {
            write!(writer, "[Vardr] ")?;
        } else {
            write!(writer, "[Vardr] {level}: ")?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

struct JsonFormat;

impl<S, N> FormatEvent<S, N> for JsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut timestamp = String::new();
        SystemTime.format_time(&mut Writer::new(&mut timestamp))?;

        let meta = event.metadata();
        let mut record = Map::new();
        record.insert("event".to_string(), Value::from(DEFAULT_EVENT));
        record.insert("timestamp".to_string(), Value::from(timestamp));
        record.insert("level".to_string(), Value::from(meta.level().to_string()));
        record.insert("target".to_string(), Value::from(meta.target()));
        event.record(&mut JsonFields(&mut record));

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

/// Collects event fields into a JSON object. Fields listed in
/// [`JSON_LOG_FIELDS`] are embedded as JSON values.
struct JsonFields<'a>(&'a mut Map<String, Value>);

impl JsonFields<'_> {
    fn insert_text(&mut self, field: &Field, text: String) {
        let value = if JSON_LOG_FIELDS.contains(&field.name()) {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for JsonFields<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert_text(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert_text(field, format!("{value:?}"));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }
}

/// Run `f` under the production formatter and return what it logged.
#[cfg(test)]
pub(crate) fn capture(json: bool, f: impl FnOnce()) -> String {
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let out = Shared(Arc::new(Mutex::new(Vec::new())));
    let sink = out.clone();
    let builder = builder().with_writer(move || sink.clone());
    if json {
        tracing::subscriber::with_default(builder.event_format(JsonFormat).finish(), f);
    } else {
        tracing::subscriber::with_default(builder.event_format(PlainFormat).finish(), f);
    }
    let bytes = out.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[cfg(test)]
mod tests {
    use tracing::{info, warn};

    use super::*;

    fn records(logs: &str) -> Vec<Value> {
        logs.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
    }

    #[test]
    fn plain_lines_have_no_escape_codes() {
        let logs = capture(false, || {
            info!(dir = %"/tmp/certs", "Checking for certificates");
            warn!("Could not import c: no PEM certificate found");
        });
        assert!(!logs.contains('\x1b'));
        let lines: Vec<&str> = logs.lines().collect();
        assert_eq!(lines[0], "[Vardr] Checking for certificates dir=/tmp/certs");
        assert_eq!(lines[1], "[Vardr] WARN: Could not import c: no PEM certificate found");
    }

    #[test]
    fn every_json_record_has_a_discriminator() {
        let logs = capture(true, || {
            info!("Starting certificate import process...");
            info!(event = "certificates_unchanged", fingerprint = "abc", "Certificates unchanged");
        });
        let records = records(&logs);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["event"], "log");
        assert_eq!(records[0]["level"], "INFO");
        assert_eq!(records[0]["message"], "Starting certificate import process...");
        assert!(records[0]["timestamp"].is_string());
        assert_eq!(records[1]["event"], "certificates_unchanged");
        assert_eq!(records[1]["fingerprint"], "abc");
    }

    #[test]
    fn import_summary_results_are_an_object() {
        let root = tempfile::tempdir().unwrap();
        let certs = root.path().join("certs");
        std::fs::create_dir_all(&certs).unwrap();
        std::fs::write(certs.join("c.crt"), "not a cert").unwrap();
        let config =
            vardr_engine::domain::types::MergerConfig::with_dirs(&certs, root.path().join("state"));

        let logs = capture(true, || {
            vardr_engine::reconcile_pem_bundle(config).unwrap();
        });
        let records = records(&logs);
        assert!(records.iter().all(|r| r["event"].is_string()));

        let summary = records
            .iter()
            .find(|r| r["event"] == "certificate_import_summary")
            .unwrap();
        assert_eq!(summary["successful_imports"], 0);
        assert_eq!(summary["failed_imports"], 1);
        assert_eq!(summary["total_certificates"], 1);
        assert_eq!(summary["results"]["c"], "FAILED: no PEM certificate found");
    }
}
