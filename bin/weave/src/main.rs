use weaver::bytecode::model::ClassDefinition;
use weaver::weave::{DirectiveRegistry, HandlerLibrary, Settings, WeaveStatus, Weaver};
use weaver::*;

use clap::{Arg, ArgAction, Command};
use std::fs::File;
use std::io::{BufReader, BufWriter};

/// Read a class from its JSON form, recomputing the stack and locals bounds
fn load_class(path: &str) -> Result<ClassDefinition, weave::Error> {
    log::info!("Reading class '{}'", path);
    let reader = BufReader::new(File::open(path)?);
    let mut class: ClassDefinition = serde_json::from_reader(reader)?;
    class.check_members()?;
    class.recompute_bounds()?;
    Ok(class)
}

fn main() -> Result<(), weave::Error> {
    env_logger::init();

    let matches = Command::new("Bytecode weaver")
        .version("0.1.0")
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Weave handler directives into a class definition")
        .arg(
            Arg::new("class")
                .long("class")
                .value_name("CLASS_JSON")
                .required(true)
                .help("Class to weave, as JSON"),
        )
        .arg(
            Arg::new("directives")
                .long("directives")
                .value_name("DIRECTIVES_JSON")
                .required(true)
                .help("JSON array of directive records"),
        )
        .arg(
            Arg::new("handlers")
                .long("handlers")
                .value_name("CLASS_JSON")
                .action(ArgAction::Append)
                .help("Handler class, as JSON (may be repeated)"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("SETTINGS_JSON")
                .help("Weaver settings (unspecified fields keep their defaults)"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("OUTPUT_JSON")
                .help("Write the woven class here"),
        )
        .arg(
            Arg::new("listing")
                .long("listing")
                .action(ArgAction::SetTrue)
                .help("Print the woven class"),
        )
        .get_matches();

    let settings = match matches.get_one::<String>("settings") {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None => Settings::new(),
    };

    let class_path = matches
        .get_one::<String>("class")
        .expect("`--class` is required");
    let mut class = load_class(class_path)?;

    let directives_path = matches
        .get_one::<String>("directives")
        .expect("`--directives` is required");
    log::info!("Reading directives '{}'", directives_path);
    let registry =
        DirectiveRegistry::from_json(BufReader::new(File::open(directives_path)?), &settings)?;

    let handlers: HandlerLibrary = matches
        .get_many::<String>("handlers")
        .into_iter()
        .flatten()
        .map(|path| load_class(path))
        .collect::<Result<_, _>>()?;
    log::info!(
        "Weaving {} directive(s) with {} handler class(es)",
        registry.directives_for(&class.name).len(),
        handlers.len()
    );

    let outcomes = Weaver::new(&settings, &handlers).weave_registered(&mut class, &registry);
    for outcome in &outcomes {
        match &outcome.status {
            WeaveStatus::Applied => println!(
                "applied  {} ({} point(s) in {})",
                outcome.directive,
                outcome.points,
                outcome.methods.join(", ")
            ),
            WeaveStatus::Skipped(err) => println!("skipped  {}: {}", outcome.directive, err),
            WeaveStatus::Failed(err) => println!("failed   {}: {}", outcome.directive, err),
        }
    }

    if matches.get_flag("listing") {
        print!("{}", class.listing());
    }

    if let Some(output_path) = matches.get_one::<String>("output") {
        log::info!("Writing '{}'", output_path);
        let writer = BufWriter::new(File::create(output_path)?);
        serde_json::to_writer_pretty(writer, &class)?;
    }

    Ok(())
}
