use std::{fmt, future::Future, path::PathBuf};

use anyhow::{Result, anyhow};
use inquire::{InquireError, Select, Text};
use jatim_weather_core::stats;

use crate::{session::Session, view};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    ViewAll,
    ViewDistrict,
    SearchCondition,
    Statistics,
    Export,
    Refresh,
    Quit,
}

impl MenuChoice {
    const ALL: [MenuChoice; 7] = [
        MenuChoice::ViewAll,
        MenuChoice::ViewDistrict,
        MenuChoice::SearchCondition,
        MenuChoice::Statistics,
        MenuChoice::Export,
        MenuChoice::Refresh,
        MenuChoice::Quit,
    ];
}

impl fmt::Display for MenuChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuChoice::ViewAll => "View weather for all districts",
            MenuChoice::ViewDistrict => "View weather for one district",
            MenuChoice::SearchCondition => "Search by weather condition",
            MenuChoice::Statistics => "Statistics & chart",
            MenuChoice::Export => "Export data to CSV",
            MenuChoice::Refresh => "Refresh data",
            MenuChoice::Quit => "Quit",
        })
    }
}

/// Interactive loop. Returns when the user quits or interrupts a prompt.
pub async fn run(session: &Session) -> Result<()> {
    view::print_header();
    if until_interrupted(session.refresh(), tokio::signal::ctrl_c()).await.is_none() {
        farewell();
        return Ok(());
    }

    loop {
        println!();
        let choice = Select::new("Main menu", MenuChoice::ALL.to_vec()).prompt();
        let on_menu = choice.is_err();

        let outcome = match choice {
            Ok(MenuChoice::Quit) => break,
            Ok(MenuChoice::ViewAll) => {
                view::print_summary(&session.store().get_all());
                Ok(())
            }
            Ok(MenuChoice::ViewDistrict) => show_district(session),
            Ok(MenuChoice::SearchCondition) => search_condition(session),
            Ok(MenuChoice::Statistics) => show_statistics(session),
            Ok(MenuChoice::Export) => export(session),
            Ok(MenuChoice::Refresh) => {
                if until_interrupted(session.refresh(), tokio::signal::ctrl_c()).await.is_none() {
                    break;
                }
                view::print_success("Weather data refreshed!");
                Ok(())
            }
            Err(e) => Err(e.into()),
        };

        if let Err(e) = outcome {
            match e.downcast_ref::<InquireError>() {
                Some(InquireError::OperationInterrupted) => break,
                // Esc inside a sub-prompt returns to the menu; on the menu itself it quits.
                Some(InquireError::OperationCanceled) if on_menu => break,
                Some(InquireError::OperationCanceled) => {}
                _ => view::print_error(&format!("{e:#}")),
            }
        }
    }

    farewell();
    Ok(())
}

/// Drive `work` to completion unless `interrupt` resolves first.
///
/// Dropping an unfinished refresh aborts its in-flight fetches.
async fn until_interrupted<W, I>(work: W, interrupt: I) -> Option<W::Output>
where
    W: Future,
    I: Future,
{
    tokio::select! {
        output = work => Some(output),
        _ = interrupt => None,
    }
}

fn farewell() {
    println!();
    println!("👋 Thank you for using the East Java weather information system!");
}

fn show_district(session: &Session) -> Result<()> {
    let districts = session.store().districts();
    if districts.is_empty() {
        view::print_error("No weather data available");
        return Ok(());
    }

    view::print_districts(&districts);
    let input = Text::new("District number or name:").prompt()?;
    let district = resolve_district(&districts, &input)?;

    match session.store().get(district) {
        Some(record) => view::print_detail(&record),
        None => view::print_error(&format!("No weather data for {district}")),
    }
    Ok(())
}

/// 1-based index into `districts`, or the first name containing `input`.
fn resolve_district<'a>(districts: &'a [String], input: &str) -> Result<&'a str> {
    let input = input.trim();
    if input.is_empty() {
        return Err(anyhow!("No district given"));
    }

    if input.chars().all(|c| c.is_ascii_digit()) {
        let index: usize = input.parse()?;
        return index
            .checked_sub(1)
            .and_then(|i| districts.get(i))
            .map(String::as_str)
            .ok_or_else(|| anyhow!("Invalid district number {index}"));
    }

    stats::search_districts(districts, input)
        .first()
        .copied()
        .ok_or_else(|| anyhow!("District '{input}' not found"))
}

fn search_condition(session: &Session) -> Result<()> {
    let needle = Text::new("Condition to search for (e.g. Cloudy, Sunny, Rain):").prompt()?;
    if needle.trim().is_empty() {
        view::print_error("Condition must not be empty");
        return Ok(());
    }

    let snapshot = session.store().get_all();
    let matches = stats::filter_by_condition(&snapshot, &needle);
    view::print_condition_matches(needle.trim(), &matches);
    Ok(())
}

fn show_statistics(session: &Session) -> Result<()> {
    let snapshot = session.store().get_all();
    if snapshot.is_empty() {
        view::print_error("No data for statistics");
        return Ok(());
    }

    let with_chart = Select::new("Statistics", vec!["Statistics only", "Statistics + chart"])
        .prompt()?
        == "Statistics + chart";

    view::print_statistics(&stats::describe(&snapshot), &stats::condition_counts(&snapshot));

    if with_chart {
        match session.export_chart(None)? {
            Some(path) => view::print_success(&format!("Chart saved to {}", path.display())),
            None => view::print_error("No data to plot"),
        }
    }
    Ok(())
}

fn export(session: &Session) -> Result<()> {
    if session.store().is_empty() {
        view::print_error("No data to export");
        return Ok(());
    }

    let name = Text::new("File name (empty for automatic):").prompt()?;
    let path = Some(name.trim()).filter(|n| !n.is_empty()).map(PathBuf::from);

    match session.export_csv(path)? {
        Some(written) => {
            view::print_success(&format!("Data exported to {}", written.display()));
            println!("📁 File contains {} weather records", session.store().len());
        }
        None => view::print_error("Export failed: no data"),
    }
    Ok(())
}
