use {
    clap::{crate_description, crate_name, crate_version},
    log::*,
    std::process::exit,
    tap_cli::{
        clap_app::get_clap_app,
        cli::{global_flag, parse_args, process_command},
    },
};

fn main() {
    let matches = get_clap_app(crate_name!(), crate_description!(), crate_version!()).get_matches();
    if global_flag(&matches, "verbose") {
        tap_logger::setup_with_default("debug");
    } else {
        tap_logger::setup();
    }

    let config = match parse_args(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            exit(1);
        }
    };

    match runtime.block_on(process_command(&config)) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
        }
        Err(err) => {
            debug!("command failed: {err:?}");
            eprintln!("error: {err}");
            exit(1);
        }
    }
}
