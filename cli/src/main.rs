//! `slidecastctl` entry
//!
//! The cli program to push images to slidecastd

mod cli;
mod client;

use clap::Parser;
use std::process::ExitCode;

use client::Request;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let response =
        Request::from_command(&cli.command).and_then(|request| client::send(&cli.host, request));
    match response {
        Ok(response) => {
            println!("{}", response.body);
            if response.is_success() {
                ExitCode::SUCCESS
            } else {
                eprintln!("slidecastd replied with status {}", response.status);
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
