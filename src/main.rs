use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use wxdash_core::{AppError, Config, ConfigError};
use wxdash_services::{Dashboard, WeatherView};

const HELP: &str = "\
Type a city (\"Paris, FR\") to search.
  /units      toggle metric/imperial
  /fav        list favorites
  /fav N      show favorite N
  /clear      clear favorites
  /ask TEXT   ask about the weather (or: ? TEXT)
  /quit       exit";

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Search(&'a str),
    ToggleUnits,
    ListFavorites,
    SelectFavorite(usize),
    ClearFavorites,
    Ask(&'a str),
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> Option<Command<'_>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(prompt) = line.strip_prefix('?') {
        return Some(Command::Ask(prompt.trim()));
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Search(line));
    };

    let (name, arg) = rest
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((rest, ""));

    let command = match (name, arg) {
        ("units", _) => Command::ToggleUnits,
        ("fav", "") => Command::ListFavorites,
        // Favorites are shown 1-based.
        ("fav", n) => match n.parse::<usize>() {
            Ok(n) if n > 0 => Command::SelectFavorite(n - 1),
            _ => Command::Unknown(line),
        },
        ("clear", _) => Command::ClearFavorites,
        ("ask", prompt) => Command::Ask(prompt),
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Unknown(line),
    };
    Some(command)
}

fn print_view(view: &WeatherView) {
    println!("{}", view.city);
    println!(
        "  {:.1}{}  {}  humidity {}%  wind {:.1} {}",
        view.temperature,
        view.temperature_symbol,
        view.condition_text,
        view.humidity_pct,
        view.wind_speed,
        view.speed_symbol
    );

    for day in &view.forecast {
        let temp = |t: Option<f64>| match t {
            Some(t) => format!("{:.0}{}", t, view.temperature_symbol),
            None => "--".to_string(),
        };
        println!(
            "  {}  {} / {}  {}",
            day.date.format("%a %d %b"),
            temp(day.min_temp),
            temp(day.max_temp),
            day.condition_text.as_deref().unwrap_or("")
        );
    }
}

fn print_error(err: &AppError) {
    tracing::debug!("{}", err);
    println!("{}", err.user_message());
}

async fn handle(dashboard: &Dashboard, command: Command<'_>) -> bool {
    match command {
        Command::Search(raw) => match dashboard.search(raw).await {
            Ok(view) => print_view(&view),
            Err(e) => print_error(&e),
        },
        Command::SelectFavorite(index) => match dashboard.select_favorite(index).await {
            Ok(view) => print_view(&view),
            Err(e) => print_error(&e),
        },
        Command::ToggleUnits => {
            let units = dashboard.toggle_units();
            match dashboard.view() {
                Some(view) => print_view(&view),
                None => println!("Units: {}", units),
            }
        }
        Command::ListFavorites => {
            let favorites = dashboard.favorites();
            if favorites.is_empty() {
                println!("No favorites yet.");
            }
            for (i, city) in favorites.iter().enumerate() {
                println!("  {}. {}", i + 1, city);
            }
        }
        Command::ClearFavorites => match dashboard.clear_favorites() {
            Ok(()) => println!("Favorites cleared."),
            Err(e) => print_error(&e),
        },
        Command::Ask(prompt) => match dashboard.ask(prompt).await {
            Ok(answer) => println!("{}", answer),
            Err(e) => print_error(&e),
        },
        Command::Help => println!("{}", HELP),
        Command::Unknown(line) => println!("Unknown command: {} (try /help)", line),
        Command::Quit => return false,
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    wxdash_core::init()?;

    let (config, _validation) = match Config::load_validated() {
        Ok(loaded) => loaded,
        Err(e) => {
            if let Some(config_err) = e.downcast_ref::<ConfigError>() {
                eprintln!("{}", config_err.user_message());
            }
            return Err(e);
        }
    };
    let dashboard = Dashboard::from_config(&config)?;

    tracing::info!(
        "wxdash started with {} favorites, units {}",
        dashboard.favorites().len(),
        dashboard.units()
    );
    println!("wxdash weather dashboard. /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_command(&line) else {
            continue;
        };
        if !handle(&dashboard, command).await {
            break;
        }
    }

    tracing::info!("wxdash shutting down");
    Ok(())
}
