use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use sysmon::core::system_monitor::DEFAULT_ERROR_LOG;

fn main() -> Result<()> {
    sysmon::init_logging();

    let matches = Command::new("sysmon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live CPU, memory, disk, battery, network and uptime monitor")
        .subcommand(
            Command::new("monitor")
                .about("Sample system metrics until interrupted")
                .long_about("Sample system metrics until interrupted\n\nWhile running, type on stdin:\n    interval <secs>    change the refresh interval\n    disk <id>          watch another disk (mount point or device)")
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECS")
                        .help("Refresh interval in seconds (presets: 0.5, 1, 2, 5)")
                        .value_parser(clap::value_parser!(f64))
                )
                .arg(
                    Arg::new("disk")
                        .short('d')
                        .long("disk")
                        .value_name("ID")
                        .help("Disk to watch, by mount point or device name")
                )
                .arg(
                    Arg::new("rounds")
                        .short('n')
                        .long("rounds")
                        .value_name("N")
                        .help("Stop after printing N snapshots")
                        .value_parser(clap::value_parser!(u64).range(1..))
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print each snapshot as a JSON line")
                        .action(ArgAction::SetTrue)
                )
                .arg(
                    Arg::new("history")
                        .long("history")
                        .help("Print CPU and RAM sparklines under each line")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("json")
                )
                .arg(
                    Arg::new("error-log")
                        .long("error-log")
                        .value_name("PATH")
                        .help("Append metric errors to a log file")
                        .num_args(0..=1)
                        .default_missing_value(DEFAULT_ERROR_LOG)
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                )
                .arg(
                    Arg::new("no-input")
                        .long("no-input")
                        .help("Do not read control commands from stdin")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("disks")
                .about("List disks that can be selected with 'monitor --disk'")
        )
        .subcommand(
            Command::new("config")
                .about("Show or change persisted settings (use 'sysmon config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(
                    Command::new("show")
                        .about("Print the current settings")
                )
                .subcommand(
                    Command::new("set")
                        .about("Change one or more settings")
                        .arg_required_else_help(true)
                        .arg(
                            Arg::new("interval")
                                .long("interval")
                                .value_name("SECS")
                                .help("Default refresh interval in seconds")
                                .value_parser(clap::value_parser!(f64))
                        )
                        .arg(
                            Arg::new("disk")
                                .long("disk")
                                .value_name("ID")
                                .help("Default disk to watch")
                        )
                        .arg(
                            Arg::new("history")
                                .long("history")
                                .value_name("N")
                                .help("Number of samples kept for the CPU and RAM histories")
                                .value_parser(clap::value_parser!(usize))
                        )
                        .arg(
                            Arg::new("alert-threshold")
                                .long("alert-threshold")
                                .value_name("PERCENT")
                                .help("Raise an alert above this usage")
                                .value_parser(clap::value_parser!(f32))
                        )
                        .arg(
                            Arg::new("alert-policy")
                                .long("alert-policy")
                                .value_name("POLICY")
                                .help("When to raise alerts")
                                .value_parser(["every-round", "on-crossing"])
                        )
                )
                .subcommand(
                    Command::new("reset")
                        .about("Restore default settings")
                )
        )
        .get_matches();

    match matches.subcommand() {
        Some(("monitor", _)) | Some(("disks", _)) => {
            sysmon::commands::sys::execute(&matches)?;
        }
        Some(("config", sub_matches)) => {
            sysmon::commands::config::execute(sub_matches)?;
        }
        _ => {
            println!("Welcome to sysmon!");
            println!("Use 'sysmon --help' for more information.");
        }
    }

    Ok(())
}
