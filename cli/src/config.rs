use {
    crate::{
        cli::{CliConfig, CliError, ProcessResult},
        output::CliConfigValues,
    },
    clap::{App, AppSettings, Arg, ArgMatches, SubCommand},
    log::*,
    tap_cli_config::Config,
};

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigCliCommand {
    /// `None` shows every value.
    Get { key: Option<String> },
    Set { key: String, value: String },
}

pub trait ConfigSubCommands {
    fn config_subcommands(self) -> Self;
}

impl ConfigSubCommands for App<'_, '_> {
    fn config_subcommands(self) -> Self {
        self.subcommand(
            SubCommand::with_name("config")
                .about("Token Tap CLI configuration settings")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .subcommand(
                    SubCommand::with_name("get")
                        .about("Show the effective configuration")
                        .arg(
                            Arg::with_name("key")
                                .index(1)
                                .value_name("KEY")
                                .takes_value(true)
                                .possible_values(Config::KEYS)
                                .help("Show only this setting"),
                        ),
                )
                .subcommand(
                    SubCommand::with_name("set")
                        .about("Write a setting to the config file")
                        .arg(
                            Arg::with_name("key")
                                .index(1)
                                .value_name("KEY")
                                .takes_value(true)
                                .required(true)
                                .possible_values(Config::KEYS),
                        )
                        .arg(
                            Arg::with_name("value")
                                .index(2)
                                .value_name("VALUE")
                                .takes_value(true)
                                .required(true),
                        ),
                ),
        )
    }
}

pub fn parse_config_command(matches: &ArgMatches<'_>) -> Result<ConfigCliCommand, CliError> {
    match matches.subcommand() {
        ("get", Some(matches)) => Ok(ConfigCliCommand::Get {
            key: matches.value_of("key").map(str::to_string),
        }),
        ("set", Some(matches)) => Ok(ConfigCliCommand::Set {
            key: matches.value_of("key").unwrap_or_default().to_string(),
            value: matches.value_of("value").unwrap_or_default().to_string(),
        }),
        (name, _) => Err(CliError::BadParameter(format!(
            "unknown config command {name:?}"
        ))),
    }
}

pub fn process_config_command(config: &CliConfig, command: &ConfigCliCommand) -> ProcessResult {
    match command {
        ConfigCliCommand::Get { key: Some(key) } => Ok(config.config.get_value(key)?),
        ConfigCliCommand::Get { key: None } => {
            let values = CliConfigValues {
                config_file: config.config_file.clone(),
                config: config.config.clone(),
            };
            Ok(config.output_format.formatted_string(&values)?)
        }
        ConfigCliCommand::Set { key, value } => {
            let config_file = config.config_file.as_deref().ok_or_else(|| {
                CliError::BadParameter("no config file location; pass --config".to_string())
            })?;
            // Start from the file alone so environment and flag overrides
            // are not persisted.
            let mut file_config = Config::load_or_default(config_file)?;
            file_config.set_value(key, value)?;
            file_config.save(config_file)?;
            info!("{key} written to {config_file}");
            Ok(format!("{key} = {}", file_config.get_value(key)?))
        }
    }
}
