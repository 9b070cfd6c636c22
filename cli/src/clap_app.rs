use {
    crate::{
        config::ConfigSubCommands, explorer::ExplorerSubCommands, faucet::FaucetSubCommands,
    },
    clap::{App, AppSettings, Arg},
    tap_chain::{Address, TxHash},
};

pub fn is_valid_address(value: String) -> Result<(), String> {
    value
        .parse::<Address>()
        .map(|_| ())
        .map_err(|err| format!("invalid address {value:?}: {err}"))
}

pub fn is_valid_tx_hash(value: String) -> Result<(), String> {
    value
        .parse::<TxHash>()
        .map(|_| ())
        .map_err(|err| format!("invalid transaction hash {value:?}: {err}"))
}

pub fn get_clap_app<'ab, 'v>(name: &str, about: &'ab str, version: &'v str) -> App<'ab, 'v> {
    App::new(name)
        .about(about)
        .version(version)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config_file")
                .short("C")
                .long("config")
                .value_name("FILEPATH")
                .takes_value(true)
                .global(true)
                .help("Configuration file to use [default: ~/.config/token-tap/cli/config.yml]"),
        )
        .arg(
            Arg::with_name("json_rpc_url")
                .short("u")
                .long("url")
                .value_name("URL")
                .takes_value(true)
                .global(true)
                .help("JSON RPC URL of the node or wallet bridge"),
        )
        .arg(
            Arg::with_name("contract")
                .long("contract")
                .value_name("ADDRESS")
                .takes_value(true)
                .global(true)
                .help("Faucet token contract address"),
        )
        .arg(
            Arg::with_name("chain_id")
                .long("chain-id")
                .value_name("ID")
                .takes_value(true)
                .global(true)
                .help("Expected chain id of the network"),
        )
        .arg(
            Arg::with_name("explorer_url")
                .long("explorer-url")
                .value_name("URL")
                .takes_value(true)
                .global(true)
                .help("Block explorer base URL"),
        )
        .arg(
            Arg::with_name("sender")
                .short("s")
                .long("sender")
                .value_name("ADDRESS")
                .takes_value(true)
                .global(true)
                .help("Account to claim from [default: the provider's first account]"),
        )
        .arg(
            Arg::with_name("output_format")
                .long("output")
                .value_name("FORMAT")
                .takes_value(true)
                .global(true)
                .possible_values(&["display", "json", "json-compact"])
                .help("Return information in specified output format"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .help("Show debug logging"),
        )
        .faucet_subcommands()
        .explorer_subcommands()
        .config_subcommands()
}
