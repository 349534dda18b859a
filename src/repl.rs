//! Interactive command loop.
//!
//! One line per command. Query commands go through the shared query parser;
//! anything that is not a recognized command is treated as words to add (or
//! restore). Command errors are reported and the loop continues; only I/O
//! failure on stdin ends the session.

use crate::engine::{AddOutcome, Engine};
use crate::output;
use crate::query::parser::parse_query;
use anyhow::Result;
use std::io::{self, BufRead, Write};

const QUERY_COMMANDS: &[&str] = &[
    "exact", "pre", "suf", "sub", "sim", "sim+", "and", "or", "not", "len", "id", "complex",
];

const HELP: &str = "\
Queries:
  exact W           exact lookup
  pre W / suf W     prefix / suffix
  sub W             substring
  sim W [d]         similarity (sim+ W [d] for exhaustive search)
  and W... / or W... / not W
  len N | len N-M   length / length range
  id N-M            id range
  complex K:V...    AND-combined terms (pre suf sub not len id sim)
Mutations:
  <word> [word...]  add or restore words
  delete N / undelete N
Maintenance:
  list / list-all / alpha
  stats / validate / optimize / rebuild / save
  help / quit";

/// Run the REPL until EOF or `quit`. Errors from individual commands are
/// printed and the loop continues.
pub fn run(engine: &mut Engine, color: bool) -> Result<()> {
    if let Some(path) = engine.log_path() {
        println!(
            "{} words loaded from {} (type 'help' for commands)",
            engine.dict().active_count(),
            path.display()
        );
    }

    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match dispatch(engine, input, color) {
            Ok(Action::Continue) => {}
            Ok(Action::Quit) => break,
            Err(err) => eprintln!("error: {err:#}"),
        }
    }

    Ok(())
}

enum Action {
    Continue,
    Quit,
}

fn dispatch(engine: &mut Engine, input: &str, color: bool) -> Result<Action> {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (input, ""),
    };

    match command {
        "quit" | "exit" => return Ok(Action::Quit),
        "help" => println!("{HELP}"),

        _ if QUERY_COMMANDS.contains(&command) => {
            let query = parse_query(input)?;
            if let crate::query::Query::Complex { skipped, .. } = &query {
                for term in skipped {
                    output::print_warning(&format!("unknown term {term:?} skipped"), color)?;
                }
            }
            let outcome = engine.query(&query);
            output::print_outcome(engine.dict(), &outcome, color)?;
        }

        "delete" | "undelete" => {
            let id: u32 = rest
                .parse()
                .map_err(|_| anyhow::anyhow!("{command} takes a numeric id"))?;
            let changed = if command == "delete" {
                engine.delete(id)?
            } else {
                engine.undelete(id)?
            };
            if changed {
                println!("{command}d {id}");
            } else {
                println!("id {id} not applicable");
            }
        }

        "rebuild" => {
            let started = std::time::Instant::now();
            engine.rebuild()?;
            // Refresh the on-disk snapshot so the next start takes the fast
            // path instead of loading one that predates the rebuilt state.
            if engine.config().use_snapshot && engine.log_path().is_some() {
                engine.save_snapshot()?;
            }
            println!(
                "rebuilt {} records in {:.1} ms",
                engine.dict().len(),
                started.elapsed().as_secs_f64() * 1000.0
            );
        }

        "list" => output::print_records(&engine.list_active(), color)?,
        "list-all" => output::print_records(&engine.list_all(), color)?,
        "alpha" => output::print_records(&engine.list_alpha(), color)?,

        "stats" => engine.stats().print(),
        "validate" => engine.validate().print(),
        "optimize" => {
            engine.optimize();
            println!("optimized");
        }
        "save" => {
            engine.save_snapshot()?;
            println!("snapshot written");
        }

        // Everything else is words to add or restore.
        _ => {
            for word in input.split_whitespace() {
                match engine.add(word)? {
                    AddOutcome::Added(id) => println!("added {word} as {id}"),
                    AddOutcome::Restored(id) => println!("restored {word} ({id})"),
                    AddOutcome::Unchanged(id) => println!("{word} already present ({id})"),
                }
            }
        }
    }

    Ok(Action::Continue)
}
