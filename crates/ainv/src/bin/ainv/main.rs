mod cli;

use ainv::inventory::AnsibleInventory;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("AINV_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Parse(parse_cli) => parse(parse_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn parse(cli: cli::ParseCommand) -> anyhow::Result<()> {
    let options = cli.input.parse_options();
    let inventory = AnsibleInventory::with_options(&cli.input.hostsfile, &options)?;

    output(&cli.output, &inventory)?;
    Ok(())
}

fn output(output: &cli::OutputArgs, inventory: &AnsibleInventory) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), inventory)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), inventory)?,
    };

    Ok(())
}

/// (ainv-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    match cli.command {
        Raw { hostsfile } => {
            let root = ainv::source::detect_and_parse(&hostsfile)?;
            println!("{root:#?}");
        }
        Records { hostsfile } => {
            let inventory = AnsibleInventory::new(&hostsfile)?;
            println!("{inventory:#?}");
        }
    }

    Ok(())
}
