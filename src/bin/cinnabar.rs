// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The Cinnabar instance manager.
//!
//! The stdin command loop here is the stand-in for a tray/window UI, it only
//!   ever issues commands against the Router and reads state back for display.

use std::str::SplitWhitespace;
use std::sync::Arc;

use clap::{App, Arg, ArgMatches};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio::runtime;

use cinnabar::instance::{InstanceRecord, State};
use cinnabar::procs::{Command, RestartPolicy, Router};
use cinnabar::registry::Registry;
use cinnabar::store::JsonFileStore;
use cinnabar::ui::{LogDisplay, LogNotifier};
use cinnabar::Error;

fn app() -> App<'static, 'static> {
    App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("path to the instance configuration file")
                .takes_value(true)
                .default_value("instances.json"),
        )
        .arg(
            Arg::with_name("no-restart")
                .long("no-restart")
                .help("leave instances inactive after a clean exit instead of restarting them"),
        )
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let args = app().get_matches();

    let mut runtime = runtime::Builder::new()
        .threaded_scheduler()
        .enable_all()
        .build()
        .expect("Failed to initialize Tokio Runtime");

    runtime.block_on(run(&args))
}

async fn run(args: &ArgMatches<'_>) -> Result<(), Error> {
    let config = args.value_of("config").expect("config has a default");
    let policy = if args.is_present("no-restart") {
        RestartPolicy::Never
    } else {
        RestartPolicy::Always
    };

    let registry = Arc::new(Registry::new(Box::new(JsonFileStore::new(config))));
    registry.load().await;

    let router = Router::new(
        registry.clone(),
        Arc::new(LogNotifier),
        Arc::new(LogDisplay),
        policy,
    );
    router.attach_all();

    println!("Ready.");

    let mut lines = BufReader::new(stdin()).lines();

    loop {
        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };

        let mut words = line.split_whitespace();
        let verb = match words.next() {
            Some(verb) => verb,
            None => continue,
        };

        let result = match verb {
            "quit" | "exit" => break,
            "help" => {
                usage();
                Ok(())
            }
            "list" => {
                list(&router, &registry);
                Ok(())
            }
            "start" => named_command(&router, Command::Start, &mut words).await,
            "stop" => named_command(&router, Command::Stop, &mut words).await,
            "create" => create_command(&router, &mut words).await,
            "edit" => edit_command(&router, &mut words).await,
            "remove" => match words.next() {
                Some(name) => router.remove(name).await,
                None => Err(Error::from("usage: remove <name>")),
            },
            other => Err(Error::from(format!("unknown command: {}", other))),
        };

        if let Err(err) = result {
            eprintln!("error: {}", err);
        }
    }

    Ok(())
}

fn usage() {
    println!("commands:");
    println!("  list");
    println!("  start <name>");
    println!("  stop <name>");
    println!("  create [<name> <path> [arguments]]");
    println!("  edit <index> <name> <path> [arguments]");
    println!("  remove <name>");
    println!("  quit");
}

fn list(router: &Router, registry: &Registry) {
    for (index, record) in registry.snapshot().iter().enumerate() {
        let state = router.state_of(&record.name).unwrap_or(State::Inactive);
        println!("{:>3}  {}", index, record.title(state));
    }
}

async fn named_command(
    router: &Router,
    command: Command,
    words: &mut SplitWhitespace<'_>,
) -> Result<(), Error> {
    match words.next() {
        Some(name) => router.dispatch(name, command).await,
        None => Err(Error::from("an instance name is required")),
    }
}

async fn create_command(router: &Router, words: &mut SplitWhitespace<'_>) -> Result<(), Error> {
    match words.next() {
        Some(name) => {
            let path = words
                .next()
                .ok_or_else(|| Error::from("usage: create <name> <path> [arguments]"))?;
            let arguments = words.collect::<Vec<_>>().join(" ");

            router.create(name, path, &arguments).await
        }
        None => {
            // no fields given, create a placeholder to edit afterwards
            let record = InstanceRecord::placeholder();
            router.create(&record.name, &record.path, &record.arguments).await
        }
    }
}

async fn edit_command(router: &Router, words: &mut SplitWhitespace<'_>) -> Result<(), Error> {
    let index = words
        .next()
        .ok_or_else(|| Error::from("usage: edit <index> <name> <path> [arguments]"))?
        .parse::<usize>()
        .map_err(|_| Error::from("the index must be a number"))?;

    let name = words
        .next()
        .ok_or_else(|| Error::from("usage: edit <index> <name> <path> [arguments]"))?;
    let path = words
        .next()
        .ok_or_else(|| Error::from("usage: edit <index> <name> <path> [arguments]"))?;
    let arguments = words.collect::<Vec<_>>().join(" ");

    router.edit(index, name, path, &arguments).await
}
