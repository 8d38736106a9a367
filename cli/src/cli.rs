//! cli parameters

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    version = "0.3.0",
    about = "CLI tool for pushing images to slidecastd.",
    long_about = None
)]
pub struct Cli {
    #[arg(
        short = 'H',
        long = "host",
        value_name = "ADDR",
        default_value = "127.0.0.1:8081",
        help = "Address of the slidecastd webhook."
    )]
    pub host: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    #[command(about = "Put an image into a playlist slot")]
    Push {
        file: PathBuf,
        #[arg(short = 'i', long = "index", default_value_t = 0)]
        index: usize,
        #[arg(
            short = 't',
            long = "transition",
            value_name = "SECONDS",
            default_value_t = 1,
            allow_negative_numbers = true
        )]
        transition: i64,
    },
    #[command(about = "Replace the whole playlist, images are numbered in the given order")]
    Replace {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(
            short = 't',
            long = "transition",
            value_name = "SECONDS",
            default_value_t = 1,
            allow_negative_numbers = true
        )]
        transition: i64,
    },
    #[command(about = "Remove the image in a playlist slot")]
    Remove { index: usize },
    #[command(about = "Remove every image")]
    Clear,
    #[command(about = "Show slidecastd status")]
    Status,
}
