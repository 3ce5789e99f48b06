use std::io::{self, BufRead, Write};
use std::path::Path;

use llamaprobe_services::{compare_models, export_csv, summarize, TestResult};

use crate::display;

const LATEST_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Summary,
    Latest,
    All,
    Compare,
    Export,
    Exit,
}

impl MenuCommand {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuCommand::Summary),
            "2" => Some(MenuCommand::Latest),
            "3" => Some(MenuCommand::All),
            "4" => Some(MenuCommand::Compare),
            "5" => Some(MenuCommand::Export),
            "0" => Some(MenuCommand::Exit),
            _ => None,
        }
    }

    pub fn key(&self) -> u8 {
        match self {
            MenuCommand::Summary => 1,
            MenuCommand::Latest => 2,
            MenuCommand::All => 3,
            MenuCommand::Compare => 4,
            MenuCommand::Export => 5,
            MenuCommand::Exit => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuCommand::Summary => "Summary Statistics",
            MenuCommand::Latest => "Latest 5 Results",
            MenuCommand::All => "All Results",
            MenuCommand::Compare => "Model Comparison",
            MenuCommand::Export => "Export to CSV",
            MenuCommand::Exit => "Exit",
        }
    }

    pub fn all() -> &'static [MenuCommand] {
        &[
            MenuCommand::Summary,
            MenuCommand::Latest,
            MenuCommand::All,
            MenuCommand::Compare,
            MenuCommand::Export,
            MenuCommand::Exit,
        ]
    }
}

/// Read choices from `input` until Exit or EOF.
pub fn run_menu<R: BufRead, W: Write>(
    results: &[TestResult],
    csv_path: &Path,
    mut input: R,
    out: &mut W,
) -> io::Result<()> {
    loop {
        writeln!(out)?;
        writeln!(out, "📋 Options:")?;
        for cmd in MenuCommand::all() {
            writeln!(out, "{}. {}", cmd.key(), cmd.label())?;
        }
        write!(out, "\nChoose option (0-5): ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            writeln!(out, "👋 Goodbye!")?;
            return Ok(());
        }

        let Some(cmd) = MenuCommand::parse(&line) else {
            writeln!(out, "❌ Invalid option. Please choose 0-5.")?;
            continue;
        };

        if cmd == MenuCommand::Exit {
            writeln!(out, "👋 Goodbye!")?;
            return Ok(());
        }

        dispatch(cmd, results, csv_path, out)?;
    }
}

pub fn dispatch<W: Write>(
    cmd: MenuCommand,
    results: &[TestResult],
    csv_path: &Path,
    out: &mut W,
) -> io::Result<()> {
    match cmd {
        MenuCommand::Summary => match summarize(results) {
            Some(summary) => display::summary(out, &summary),
            None => writeln!(out, "📝 No test results found."),
        },
        MenuCommand::Latest => display::results(out, results, Some(LATEST_LIMIT)),
        MenuCommand::All => display::results(out, results, None),
        MenuCommand::Compare => display::comparison(out, &compare_models(results)),
        MenuCommand::Export => match export_csv(results, csv_path) {
            Ok(_) => writeln!(out, "✅ Results exported to {}", csv_path.display()),
            Err(e) => writeln!(out, "❌ Error exporting to CSV: {}", e),
        },
        MenuCommand::Exit => Ok(()),
    }
}
