use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

const FORMATS: [&str; 5] = ["text", "json", "csv", "markdown", "md"];

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("permalink")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("permalink")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Log engine decisions to stderr (overrides PERMALINK_LOG)")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Creates the permalink config directory, settings file and database")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location of the config directory")
                        .default_value("~/.config/permalink/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Overwrites any existing settings and database at the specified \
                        location without asking.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("generate")
                .about(
                    "Dry run: prints the rewrites an entity would get without touching the \
                database",
                )
                .arg(
                    arg!(-c --"catalog" <FILE>)
                        .required(true)
                        .help("Catalog snapshot (JSON)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-p --"product" <ID>)
                        .required(false)
                        .help("Product id")
                        .value_parser(clap::value_parser!(u64))
                        .conflicts_with("category"),
                )
                .arg(
                    arg!(--"category" <ID>)
                        .required(false)
                        .help("Category id")
                        .value_parser(clap::value_parser!(u64))
                        .conflicts_with("product"),
                )
                .arg(
                    arg!(-s --"store" <ID>)
                        .required(false)
                        .help("Generate for a single store view instead of every store")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    arg!(-r --"root-category" <ID>)
                        .required(false)
                        .help("Only build category paths below this root category")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: text, json, csv, markdown")
                        .value_parser(FORMATS)
                        .default_value("text"),
                )
                .group(
                    clap::ArgGroup::new("entity")
                        .args(["product", "category"])
                        .required(true),
                ),
        )
        .subcommand(
            command!("reindex")
                .about(
                    "Regenerates the rewrites of every entity in a catalog snapshot and stores \
                the differences",
                )
                .arg(
                    arg!(-c --"catalog" <FILE>)
                        .required(true)
                        .help("Catalog snapshot (JSON)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"products-only")
                        .required(false)
                        .help("Skip category landing pages")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-r --"root-category" <ID>)
                        .required(false)
                        .help("Only build category paths below this root category")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(FORMATS)
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("list")
                .about("Lists stored rewrites")
                .arg(
                    arg!(-s --"store" <ID>)
                        .required(false)
                        .help("Only rows of this store (0 for global rows)")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    arg!(-t --"entity-type" <TYPE>)
                        .required(false)
                        .help("Only rows of this entity type")
                        .value_parser(["product", "category"]),
                )
                .arg(
                    arg!(-i --"entity-id" <ID>)
                        .required(false)
                        .help("Only rows of this entity")
                        .value_parser(clap::value_parser!(u64))
                        .requires("entity-type"),
                )
                .arg(
                    arg!(--"redirects")
                        .required(false)
                        .help("Only redirects")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: text, json, csv, markdown")
                        .value_parser(FORMATS)
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("resolve")
                .about("Resolves a request path the way a storefront router would")
                .arg(arg!(<PATH>).required(true).help("Request path, e.g. men/shoe.html"))
                .arg(
                    arg!(-s --"store" <ID>)
                        .required(false)
                        .help("Store view resolving the path [default: global store 0]")
                        .value_parser(clap::value_parser!(u32)),
                ),
        )
}
