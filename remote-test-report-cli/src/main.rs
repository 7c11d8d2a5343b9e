// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use remote_test_report_cli::RemoteTestReportApp;

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = RemoteTestReportApp::parse();
    let output = opts.init_output();

    match opts.exec(output) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}
