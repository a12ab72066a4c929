use std::{fmt::Write as _, io};

use nu_ansi_term::Color::{Blue, DarkGray, Magenta, Red, Yellow};
use tracing::{field::Field, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields, MakeWriter,
    },
    registry::LookupSpan,
};

use crate::{cli::Args, utils::Colored};

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl tracing::field::Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }
}

/// Plain formatter: a colored level tag for everything but INFO, then the
/// message. Structured fields are appended for diagnostics only; INFO events
/// carry them for `--json` output.
pub struct CustomFormatter;

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let level = *event.metadata().level();
        match level {
            Level::TRACE => write!(writer, "{} ", Colored(Magenta, "[TRACE]")),
            Level::DEBUG => write!(writer, "{} ", Colored(Blue, "[DEBUG]")),
            Level::INFO => Ok(()),
            Level::WARN => write!(writer, "{} ", Colored(Yellow, "[WARN]")),
            Level::ERROR => write!(writer, "{} ", Colored(Red, "[ERROR]")),
        }?;

        if let Some(message) = visitor.message {
            writer.write_str(&message)?;
        }

        if level != Level::INFO && !visitor.fields.is_empty() {
            let mut fields = String::new();
            for (name, value) in &visitor.fields {
                write!(fields, " {name}={value}")?;
            }
            write!(writer, "{}", Colored(DarkGray, fields))?;
        }

        writeln!(writer)
    }
}

/// INFO goes to stdout, everything else to stderr.
enum LevelWriter {
    Stdout(io::Stdout),
    Stderr(io::Stderr),
}

impl io::Write for LevelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LevelWriter::Stdout(out) => out.write(buf),
            LevelWriter::Stderr(err) => err.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LevelWriter::Stdout(out) => out.flush(),
            LevelWriter::Stderr(err) => err.flush(),
        }
    }
}

struct WriterBuilder;

impl<'a> MakeWriter<'a> for WriterBuilder {
    type Writer = LevelWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LevelWriter::Stdout(io::stdout())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        if meta.level() == &Level::INFO {
            LevelWriter::Stdout(io::stdout())
        } else {
            LevelWriter::Stderr(io::stderr())
        }
    }
}

fn filter_level(args: &Args) -> Level {
    if args.quiet {
        Level::ERROR
    } else if args.verbose >= 2 {
        Level::TRACE
    } else if args.verbose == 1 {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

pub fn setup_logging(args: &Args) {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(format!("repomd={}", filter_level(args)))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(WriterBuilder)
        .compact()
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if args.json {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.event_format(CustomFormatter).finish())
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber was already set");
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn level_for(argv: &[&str]) -> Level {
        let args = Args::try_parse_from(argv).unwrap();
        filter_level(&args)
    }

    #[test]
    fn test_filter_level() {
        assert_eq!(level_for(&["repomd", "config"]), Level::INFO);
        assert_eq!(level_for(&["repomd", "-v", "config"]), Level::DEBUG);
        assert_eq!(level_for(&["repomd", "-vvv", "config"]), Level::TRACE);
        assert_eq!(level_for(&["repomd", "-q", "-v", "config"]), Level::ERROR);
    }
}
