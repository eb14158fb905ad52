//! Interactive roster menu.
//!
//! Generic over its input and output so sessions can be scripted.
use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use shuttle_core::{Coordinator, DispatchReport};
use shuttle_model::{
    Applicant, ApplicantUpdate, LoadWarning, ModelError, Roster, Weekday, load_roster, save_roster,
};
use tracing::{error, warn};

const MENU: &str = "\
1. Add applicant
2. Modify applicant
3. Delete applicant
4. Display all applicants
5. Display applicants by day
6. Save to file
7. Load from file
8. Process
9. Quit
";

enum Flow {
    Continue,
    Quit,
}

pub struct Session<R, W> {
    input: R,
    out: W,
    roster: Roster,
    coordinator: Coordinator,
    roster_file: Option<PathBuf>,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(input: R, out: W, coordinator: Coordinator, roster_file: Option<PathBuf>) -> Self {
        Self {
            input,
            out,
            roster: Roster::new(),
            coordinator,
            roster_file,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Serve the menu until the user quits or input ends.
    ///
    /// Only a fatal dispatch failure is returned as an error.
    pub fn run(&mut self) -> anyhow::Result<()> {
        loop {
            write!(self.out, "{MENU}Enter your choice: ")?;
            self.out.flush()?;
            let Some(line) = self.read_line()? else {
                return Ok(());
            };
            if let Flow::Quit = self.handle(line.trim())? {
                return Ok(());
            }
        }
    }

    fn handle(&mut self, choice: &str) -> anyhow::Result<Flow> {
        let Ok(choice) = choice.parse::<u8>() else {
            writeln!(self.out, "Please enter a valid number.")?;
            return Ok(Flow::Continue);
        };
        match choice {
            1 => self.add()?,
            2 => self.modify()?,
            3 => self.delete()?,
            4 => self.display_all()?,
            5 => self.display_by_day()?,
            6 => self.save()?,
            7 => self.load()?,
            8 => self.process()?,
            9 => return Ok(Flow::Quit),
            _ => writeln!(self.out, "Invalid choice")?,
        }
        Ok(Flow::Continue)
    }

    fn add(&mut self) -> anyhow::Result<()> {
        if self.roster.is_full() {
            writeln!(self.out, "Maximum number of applicants reached")?;
            return Ok(());
        }
        let name = self.prompt("Enter name: ")?;
        let days = self.prompt_days("Enter available days (separated by space): ")?;

        match self.roster.add(&name, days) {
            Ok(()) => writeln!(self.out, "Applicant added")?,
            Err(ModelError::NoValidDays) => {
                writeln!(self.out, "No valid days were entered. Applicant not added.")?
            }
            Err(ModelError::DayFull { day, max, booked }) => writeln!(
                self.out,
                "Maximum number of applicants reached for {day} ({max}): {}",
                booked.join(" ")
            )?,
            Err(e) => writeln!(self.out, "{e}")?,
        }
        Ok(())
    }

    fn modify(&mut self) -> anyhow::Result<()> {
        let name = self.prompt("Enter name: ")?;
        if !self.roster.contains(&name) {
            writeln!(self.out, "Applicant not found")?;
            return Ok(());
        }
        let new_name = self.prompt("Enter new name (leave empty to keep the current name): ")?;
        let days = self.prompt_days(
            "Enter new available days (separated by space, leave empty to keep the current days): ",
        )?;

        let update = ApplicantUpdate {
            name: Some(new_name).filter(|n| !n.is_empty()),
            days: Some(days).filter(|d| !d.is_empty()),
        };
        match self.roster.modify(&name, update) {
            Ok(outcome) => {
                for day in outcome.skipped_full {
                    writeln!(self.out, "Maximum number of applicants reached for {day}")?;
                }
                writeln!(self.out, "Applicant modified")?;
            }
            Err(e) => writeln!(self.out, "{e}")?,
        }
        Ok(())
    }

    fn delete(&mut self) -> anyhow::Result<()> {
        let name = self.prompt("Enter name: ")?;
        let matches: Vec<String> = self
            .roster
            .duplicates(&name)
            .into_iter()
            .map(|(_, a)| describe(a))
            .collect();

        let choice = match matches.len() {
            0 => {
                writeln!(self.out, "Applicant not found")?;
                return Ok(());
            }
            1 => None,
            _ => {
                writeln!(self.out, "Found multiple applicants with the same name:")?;
                for (i, line) in matches.iter().enumerate() {
                    writeln!(self.out, "{}. {line}", i + 1)?;
                }
                let pick =
                    self.prompt("Enter the number of the applicant you want to delete: ")?;
                match pick.parse::<usize>() {
                    Ok(k) => Some(k),
                    Err(_) => {
                        writeln!(self.out, "Invalid index. No applicant was deleted.")?;
                        return Ok(());
                    }
                }
            }
        };

        match self.roster.delete(&name, choice) {
            Ok(_) => writeln!(self.out, "Applicant deleted")?,
            Err(ModelError::InvalidChoice { .. }) => {
                writeln!(self.out, "Invalid index. No applicant was deleted.")?
            }
            Err(e) => writeln!(self.out, "{e}")?,
        }
        Ok(())
    }

    fn display_all(&mut self) -> anyhow::Result<()> {
        if self.roster.is_empty() {
            writeln!(self.out, "No applicants")?;
        }
        for applicant in self.roster.applicants() {
            writeln!(self.out, "{}", describe(applicant))?;
        }
        Ok(())
    }

    fn display_by_day(&mut self) -> anyhow::Result<()> {
        let Some(day) = self.prompt_day()? else {
            return Ok(());
        };
        let count = self.roster.count_on(day);
        writeln!(self.out, "Number of applicants for {day}: {count}")?;
        Ok(())
    }

    fn save(&mut self) -> anyhow::Result<()> {
        let path = self.prompt_path()?;
        let replaced = path.exists();
        match save_roster(&path, &self.roster) {
            Ok(()) if replaced => writeln!(
                self.out,
                "Applicants saved to file: {} (previous contents replaced)",
                path.display()
            )?,
            Ok(()) => writeln!(self.out, "Applicants saved to file: {}", path.display())?,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "saving roster failed");
                writeln!(self.out, "Error: Cannot open the file '{}'", path.display())?;
            }
        }
        Ok(())
    }

    fn load(&mut self) -> anyhow::Result<()> {
        let path = self.prompt_path()?;
        let report = match load_roster(&path, &mut self.roster) {
            Ok(report) => report,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "loading roster failed");
                writeln!(self.out, "Error: Cannot open the file '{}'", path.display())?;
                return Ok(());
            }
        };

        for warning in &report.warnings {
            let msg = match warning {
                LoadWarning::InvalidDay { line, token } => {
                    format!("Invalid day in file: {token} (line {line}). Skipping this entry.")
                }
                LoadWarning::DayFull { line, name, day } => {
                    format!("Maximum number of applicants reached for {day} (line {line}, {name})")
                }
                LoadWarning::NoDays { line } => {
                    format!("No valid days on line {line}. Skipping this entry.")
                }
                LoadWarning::RosterFull { line } => {
                    format!("Maximum number of applicants reached; stopped at line {line}")
                }
            };
            writeln!(self.out, "{msg}")?;
        }
        writeln!(
            self.out,
            "Applicants loaded from file: {} ({} added)",
            path.display(),
            report.loaded
        )?;
        Ok(())
    }

    fn process(&mut self) -> anyhow::Result<()> {
        let Some(day) = self.prompt_day()? else {
            return Ok(());
        };
        let names = self.roster.list_available(day);

        match self.coordinator.dispatch(day, &names) {
            Ok(report) => self.summarize(&report)?,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                error!(%day, error = %e, "dispatch failed");
                writeln!(self.out, "Dispatch failed: {e}")?;
            }
        }
        Ok(())
    }

    fn summarize(&mut self, report: &DispatchReport) -> anyhow::Result<()> {
        if report.buses.is_empty() {
            writeln!(self.out, "No applicant")?;
            return Ok(());
        }
        for bus in &report.buses {
            writeln!(
                self.out,
                "The {} carried {} of {} applicants",
                bus.role,
                bus.acknowledged,
                bus.sent.len()
            )?;
        }
        Ok(())
    }

    fn prompt(&mut self, msg: &str) -> anyhow::Result<String> {
        write!(self.out, "{msg}")?;
        self.out.flush()?;
        Ok(self.read_line()?.unwrap_or_default().trim().to_string())
    }

    /// Read a day list, reporting every token that is not a weekday.
    fn prompt_days(&mut self, msg: &str) -> anyhow::Result<Vec<Weekday>> {
        let line = self.prompt(msg)?;
        let (days, rejected) = Weekday::parse_list(&line);
        for token in rejected {
            writeln!(self.out, "Invalid day: {token}. Skipping this entry.")?;
        }
        Ok(days)
    }

    fn prompt_day(&mut self) -> anyhow::Result<Option<Weekday>> {
        let line = self.prompt("Enter the day: ")?;
        match line.parse::<Weekday>() {
            Ok(day) => Ok(Some(day)),
            Err(_) => {
                writeln!(self.out, "Invalid day: {line}")?;
                Ok(None)
            }
        }
    }

    fn prompt_path(&mut self) -> anyhow::Result<PathBuf> {
        let msg = match &self.roster_file {
            Some(p) => format!("Enter the file name [{}]: ", p.display()),
            None => "Enter the file name: ".to_string(),
        };
        let line = self.prompt(&msg)?;
        Ok(match (&self.roster_file, line.is_empty()) {
            (Some(default), true) => default.clone(),
            _ => PathBuf::from(line),
        })
    }

    /// Next input line without its terminator. `None` at end of input.
    fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

fn describe(applicant: &Applicant) -> String {
    let days: Vec<&str> = applicant.available_days().iter().map(|d| d.as_str()).collect();
    format!("{}: {}", applicant.name(), days.join(" "))
}
