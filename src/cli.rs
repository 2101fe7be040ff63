// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print JSON instead of a table")
}

fn month_arg() -> Arg {
    Arg::new("month")
        .long("month")
        .help("Month as YYYY-MM (default: current month, UTC)")
}

pub fn build_cli() -> Command {
    Command::new("purseline")
        .about("Personal finance ledger: transactions, dashboard metrics and currency switching")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Create the database and seed default categories"))
        .subcommand(category_cmd())
        .subcommand(tx_cmd())
        .subcommand(prefs_cmd())
        .subcommand(user_cmd())
        .subcommand(fx_cmd())
        .subcommand(report_cmd())
        .subcommand(Command::new("currencies").about("List supported display currencies"))
        .subcommand(Command::new("doctor").about("Check the ledger for inconsistencies"))
}

fn category_cmd() -> Command {
    Command::new("category")
        .about("Manage categories")
        .subcommand(
            Command::new("add")
                .arg(Arg::new("name").long("name").required(true))
                .arg(
                    Arg::new("type")
                        .long("type")
                        .required(true)
                        .value_parser(["inflow", "outflow"]),
                )
                .arg(Arg::new("icon").long("icon").default_value("pricetag"))
                .arg(Arg::new("color").long("color").default_value("#888888"))
                .arg(Arg::new("budget").long("budget")),
        )
        .subcommand(Command::new("list").arg(json_flag()))
        .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true)))
        .subcommand(
            Command::new("set-budget")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("amount").long("amount").required_unless_present("clear"))
                .arg(
                    Arg::new("clear")
                        .long("clear")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("amount"),
                ),
        )
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and list transactions")
        .subcommand(
            Command::new("add")
                .arg(
                    Arg::new("type")
                        .long("type")
                        .required(true)
                        .value_parser(["inflow", "outflow"]),
                )
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(Arg::new("date").long("date").help("YYYY-MM-DD or RFC 3339 (default: now)"))
                .arg(Arg::new("category").long("category"))
                .arg(Arg::new("description").long("description"))
                .arg(
                    Arg::new("recurring")
                        .long("recurring")
                        .value_parser(["daily", "weekly", "bi-weekly", "monthly", "yearly"]),
                )
                .arg(Arg::new("until").long("until").requires("recurring"))
                .arg(
                    Arg::new("occurrences")
                        .long("occurrences")
                        .value_parser(value_parser!(u32))
                        .requires("recurring"),
                )
                .arg(
                    Arg::new("reminder-days")
                        .long("reminder-days")
                        .value_parser(value_parser!(u32)),
                ),
        )
        .subcommand(
            Command::new("list")
                .arg(
                    Arg::new("type")
                        .long("type")
                        .value_parser(["inflow", "outflow"]),
                )
                .arg(month_arg())
                .arg(Arg::new("search").long("search"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize)),
                )
                .arg(json_flag()),
        )
        .subcommand(
            Command::new("edit")
                .arg(
                    Arg::new("id")
                        .long("id")
                        .required(true)
                        .value_parser(value_parser!(i64)),
                )
                .arg(Arg::new("amount").long("amount"))
                .arg(Arg::new("date").long("date"))
                .arg(Arg::new("category").long("category"))
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(
            Command::new("rm").arg(
                Arg::new("id")
                    .long("id")
                    .required(true)
                    .value_parser(value_parser!(i64)),
            ),
        )
}

fn prefs_cmd() -> Command {
    Command::new("prefs")
        .about("Display preferences")
        .subcommand(Command::new("show").arg(json_flag()))
        .subcommand(
            Command::new("set-currency")
                .about("Switch currency, converting every stored amount")
                .arg(Arg::new("currency").required(true))
                .arg(
                    Arg::new("offline")
                        .long("offline")
                        .action(ArgAction::SetTrue)
                        .help("Use the last cached rates instead of fetching"),
                ),
        )
        .subcommand(Command::new("set-date-format").arg(Arg::new("format").required(true)))
        .subcommand(Command::new("set-number-format").arg(Arg::new("format").required(true)))
        .subcommand(Command::new("resume").about("Finish an interrupted currency conversion"))
        .subcommand(Command::new("onboard").about("Mark onboarding as complete"))
}

fn user_cmd() -> Command {
    Command::new("user")
        .about("Local user profiles, each with its own ledger and preferences")
        .subcommand(
            Command::new("add")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("email").long("email").required(true)),
        )
        .subcommand(Command::new("use").arg(Arg::new("email").long("email").required(true)))
        .subcommand(Command::new("signout"))
}

fn fx_cmd() -> Command {
    Command::new("fx")
        .about("Exchange rates")
        .subcommand(
            Command::new("fetch")
                .about("Fetch and cache the latest rate snapshot")
                .arg(Arg::new("base").long("base")),
        )
        .subcommand(Command::new("list").arg(Arg::new("base").long("base")))
        .subcommand(
            Command::new("convert")
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(Arg::new("from").long("from").required(true))
                .arg(Arg::new("to").long("to").required(true))
                .arg(Arg::new("offline").long("offline").action(ArgAction::SetTrue)),
        )
}

fn report_cmd() -> Command {
    Command::new("report")
        .about("Dashboard metrics")
        .subcommand(Command::new("dashboard").arg(month_arg()).arg(json_flag()))
        .subcommand(Command::new("categories").arg(month_arg()).arg(json_flag()))
}
