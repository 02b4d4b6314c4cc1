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

//! Run JSON-serialized test scripts against a fresh emulator instance each.

use std::path::PathBuf;

use clap::Parser;

use tokio::sync::mpsc;

use emulator::script::run_script;
use emulator::utils::model::{get_entropy, TestScript};
use emulator::utils::{list_tests, report, DeviceSetup, EmulatorInstance, HtmlReport};

#[derive(Parser)]
#[command(name = "runner", about = "Run Ember emulator test scripts")]
struct Cli {
    /// Directory containing *.json test scripts
    #[arg(long)]
    tests_dir: PathBuf,

    /// Where to write HTML reports
    #[arg(long, default_value = "./reports")]
    report_dir: PathBuf,

    #[arg(long, value_enum, default_value = "only-failing")]
    html_report: HtmlReport,

    /// Fixed RNG seed for the device
    #[arg(long)]
    entropy: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), emulator::Error> {
    env_logger::init();

    let cli = Cli::parse();

    let mut failures = 0;
    for path in list_tests(&cli.tests_dir).await? {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();
        log::info!("Running {}", name);

        let script: TestScript = serde_json::from_reader(std::fs::File::open(&path)?)?;

        let setup = DeviceSetup {
            entropy: get_entropy(&cli.entropy),
            ..Default::default()
        };
        let mut instance = EmulatorInstance::spawn(setup)?;

        let (op_sender, op_receiver) = mpsc::channel(16);
        let (res_sender, mut res_receiver) = mpsc::channel(16);

        tokio::spawn(async move {
            for op in script.sequence {
                if op_sender.send(op).await.is_err() {
                    break;
                }
            }
        });
        tokio::spawn(async move { while res_receiver.recv().await.is_some() {} });

        let log = run_script(op_receiver, res_sender, &mut instance).await?;

        let render = match cli.html_report {
            HtmlReport::All => true,
            HtmlReport::OnlyFailing => !log.result,
            HtmlReport::None => false,
        };
        if render {
            std::fs::create_dir_all(&cli.report_dir)?;
            report::render_report(&cli.report_dir.join(format!("{}.html", name)), &log)?;
        }

        if log.result {
            println!("PASS {}", name);
        } else {
            failures += 1;
            println!("FAIL {}", name);
        }
    }

    if failures > 0 {
        return Err(format!("{} test(s) failed", failures).into());
    }

    Ok(())
}
