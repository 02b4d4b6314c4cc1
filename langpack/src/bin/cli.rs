// Ember Hardware Wallet firmware and supporting software libraries
//
// Copyright (C) 2025 The Ember Developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use model::langpack::TranslationsHeader;

use langpack::{build_blob, dev_keypair, get_lang_def, sign_blob, LanguageDefinition};

#[derive(Parser)]
#[command(name = "langpack", about = "Build and inspect Ember translation blobs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a blob from a bundled language or a JSON definition file
    Build {
        /// Bundled language code (cs, de, es, fr)
        #[arg(long, conflicts_with = "file")]
        lang: Option<String>,
        /// JSON definition file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Output path
        #[arg(long)]
        out: PathBuf,
        /// Skip signing (only installable with relaxed safety checks)
        #[arg(long)]
        unsigned: bool,
    },
    /// Print the header of an existing blob
    Inspect {
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Build {
            lang,
            file,
            out,
            unsigned,
        } => {
            let def: LanguageDefinition = match (lang, file) {
                (Some(lang), None) => get_lang_def(&lang)?,
                (None, Some(file)) => serde_json::from_reader(fs::File::open(file)?)?,
                _ => return Err("Pass exactly one of --lang and --file".into()),
            };

            let mut blob = build_blob(&def)?;
            if !unsigned {
                sign_blob(&mut blob, &dev_keypair());
            }

            fs::write(&out, &blob)?;
            log::info!("Wrote {} bytes to {}", blob.len(), out.display());
        }
        Command::Inspect { file } => {
            let blob = fs::read(file)?;
            let header = TranslationsHeader::parse(&blob)?;

            println!("language:  {}", header.language);
            println!("version:   {}", header.version);
            println!("items:     {}", header.item_count);
            println!("payload:   {} bytes", header.data_length);
            println!(
                "signature: {}",
                if header.is_unsigned() { "none" } else { "present" }
            );
            println!(
                "payload hash: {}",
                if header.verify_payload(&blob).is_ok() {
                    "ok"
                } else {
                    "MISMATCH"
                }
            );
        }
    }

    Ok(())
}
