//! Result formatting for query and listing output.

use crate::dict::{Dictionary, Record};
use crate::query::QueryOutcome;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stream(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print query hits as `id<tab>word`, with the distance column for
/// similarity results, followed by a latency footer.
pub fn print_outcome(dict: &Dictionary, outcome: &QueryOutcome, color: bool) -> io::Result<()> {
    let mut stdout = stream(color);

    for hit in &outcome.hits {
        let Some(record) = dict.get_by_id(hit.id) else {
            continue;
        };

        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(stdout, "{}", hit.id)?;
        stdout.reset()?;
        write!(stdout, "\t{}", record.word)?;

        if let Some(distance) = hit.distance {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(stdout, "  (distance {distance})")?;
            stdout.reset()?;
        }
        writeln!(stdout)?;
    }

    stdout.set_color(ColorSpec::new().set_dimmed(true))?;
    write!(
        stdout,
        "{} hit(s) in {:.3} ms",
        outcome.hits.len(),
        outcome.elapsed.as_secs_f64() * 1000.0
    )?;
    stdout.reset()?;

    if outcome.timed_out {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        write!(stdout, "  [timed out, partial result]")?;
        stdout.reset()?;
    }
    if outcome.out_of_range {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        write!(stdout, "  [id range outside observed ids]")?;
        stdout.reset()?;
    }
    writeln!(stdout)?;

    Ok(())
}

/// Print records as `id<tab>word`, marking deleted ones.
pub fn print_records(records: &[&Record], color: bool) -> io::Result<()> {
    let mut stdout = stream(color);

    for record in records {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(stdout, "{}", record.id)?;
        stdout.reset()?;
        write!(stdout, "\t{}", record.word)?;

        if record.deleted {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            write!(stdout, "  [deleted]")?;
            stdout.reset()?;
        }
        writeln!(stdout)?;
    }

    stdout.set_color(ColorSpec::new().set_dimmed(true))?;
    writeln!(stdout, "{} record(s)", records.len())?;
    stdout.reset()?;

    Ok(())
}

/// Print a yellow warning line to stdout.
pub fn print_warning(message: &str, color: bool) -> io::Result<()> {
    let mut stdout = stream(color);
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    writeln!(stdout, "{message}")?;
    stdout.reset()?;
    Ok(())
}
