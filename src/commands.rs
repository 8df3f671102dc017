//! Console front end: parses input lines and renders published state.

use std::str::FromStr;

use chrono::DateTime;

use crate::{
    allergens::{CanonicalAllergen, ScanOutcome},
    db::HistoryEntry,
    scan::{ScanEvent, ScanPhase, ScanSessionState},
    ScannerApp,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Scan(String),
    Clear,
    Toggle(CanonicalAllergen),
    Profile,
    History,
    ClearHistory,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// `None` for blank lines. Anything not starting with `:` is a barcode.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(line.parse())
    }
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let Some(command) = line.strip_prefix(':') else {
            return Ok(ConsoleCommand::Scan(line.to_string()));
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "clear" => Ok(ConsoleCommand::Clear),
            "toggle" if arg.is_empty() => Err("usage: :toggle <allergen>".to_string()),
            "toggle" => arg
                .parse::<CanonicalAllergen>()
                .map(ConsoleCommand::Toggle)
                .map_err(|e| e.to_string()),
            "profile" => Ok(ConsoleCommand::Profile),
            "history" => Ok(ConsoleCommand::History),
            "clear-history" => Ok(ConsoleCommand::ClearHistory),
            "help" => Ok(ConsoleCommand::Help),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            other => Err(format!("unknown command ':{other}' (try :help)")),
        }
    }
}

pub async fn dispatch(app: &ScannerApp, command: ConsoleCommand) -> Result<String, String> {
    match command {
        ConsoleCommand::Scan(barcode) => scan_barcode(app, &barcode).await,
        ConsoleCommand::Clear => clear_scan(app).await,
        ConsoleCommand::Toggle(allergen) => toggle_allergen(app, allergen),
        ConsoleCommand::Profile => Ok(get_profile(app)),
        ConsoleCommand::History => get_history(app).await,
        ConsoleCommand::ClearHistory => clear_history(app).await,
        ConsoleCommand::Help => Ok(HELP.to_string()),
        ConsoleCommand::Quit => Ok("Bye".to_string()),
    }
}

pub async fn scan_barcode(app: &ScannerApp, barcode: &str) -> Result<String, String> {
    if app.controller.on_barcode_scanned(barcode).await {
        Ok(format!("Scanning {barcode}"))
    } else {
        Err(format!(
            "Ignored {barcode}: finish the current scan first (:clear)"
        ))
    }
}

pub async fn clear_scan(app: &ScannerApp) -> Result<String, String> {
    app.controller.clear().await;
    Ok("Cleared".to_string())
}

pub fn toggle_allergen(app: &ScannerApp, allergen: CanonicalAllergen) -> Result<String, String> {
    let selected = app
        .controller
        .profile()
        .toggle(allergen)
        .map_err(|e| format!("{e:#}"))?;
    Ok(format!(
        "{allergen} {}",
        if selected { "added" } else { "removed" }
    ))
}

pub fn get_profile(app: &ScannerApp) -> String {
    let profile = app.controller.profile().get();
    CanonicalAllergen::ALL
        .iter()
        .map(|allergen| {
            let mark = if profile.contains(*allergen) { 'x' } else { ' ' };
            format!("[{mark}] {allergen}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn get_history(app: &ScannerApp) -> Result<String, String> {
    let entries = app
        .controller
        .history()
        .all()
        .await
        .map_err(|e| e.to_string())?;
    if entries.is_empty() {
        return Ok("No scans yet".to_string());
    }
    Ok(entries
        .iter()
        .map(render_history_entry)
        .collect::<Vec<_>>()
        .join("\n"))
}

pub async fn clear_history(app: &ScannerApp) -> Result<String, String> {
    let removed = app
        .controller
        .history()
        .clear()
        .await
        .map_err(|e| e.to_string())?;
    Ok(format!("Removed {removed} history entries"))
}

pub fn render_state(state: &ScanSessionState) -> String {
    let barcode = state.last_barcode.as_deref().unwrap_or_default();
    match state.phase {
        ScanPhase::Idle => "Ready to scan".to_string(),
        ScanPhase::Loading => format!("Looking up {barcode}..."),
        ScanPhase::Failed => state
            .error_message
            .clone()
            .unwrap_or_else(|| format!("Scan of {barcode} failed")),
        ScanPhase::Resolved => {
            let product = state.product.as_ref();
            let name = product
                .and_then(|p| p.name.as_deref())
                .unwrap_or("Unknown product");
            let mut out = match &state.outcome {
                ScanOutcome::Unsafe(conflicts) => {
                    format!("UNSAFE {name}: contains {}", conflicts.labels().join(", "))
                }
                _ => format!("SAFE {name}"),
            };
            if let Some(product) = product.filter(|p| !p.detected_allergens.is_empty()) {
                let detected: Vec<&str> =
                    product.detected_allergens.iter().map(|a| a.label()).collect();
                out.push_str(&format!("\n  detected: {}", detected.join(", ")));
            }
            out
        }
    }
}

/// Line to print for an event, if any.
pub fn render_event(event: &ScanEvent) -> Option<String> {
    match event {
        ScanEvent::StateChanged(state) => Some(render_state(state)),
        ScanEvent::ScanRecorded(_) => None,
        ScanEvent::HistoryWriteFailed { barcode, message } => {
            Some(format!("warning: scan of {barcode} was not saved ({message})"))
        }
    }
}

fn render_history_entry(entry: &HistoryEntry) -> String {
    let when = DateTime::from_timestamp_millis(entry.timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| entry.timestamp_millis.to_string());
    let mut line = format!(
        "{when}  {:<6} {} ({})",
        entry.verdict.as_str(),
        entry.product_name,
        entry.barcode
    );
    if !entry.conflicting_allergens.is_empty() {
        line.push_str(&format!(" [{}]", entry.conflicting_allergens.join(", ")));
    }
    line
}

const HELP: &str = "\
<barcode>           look up a product
:clear              dismiss the current result
:toggle <allergen>  add or remove an allergen from your profile
:profile            show your profile
:history            list past scans
:clear-history      delete all past scans
:quit               exit";

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;

    use crate::{
        db::Database,
        history::HistoryLedger,
        lookup::{LookupError, LookupResponse, ProductLookup, ProductRecord},
        profile::ProfileRegistry,
        scan::ScanController,
        settings::SettingsStore,
    };

    struct CannedLookup;

    #[async_trait]
    impl ProductLookup for CannedLookup {
        async fn lookup(&self, barcode: &str) -> Result<LookupResponse, LookupError> {
            if barcode == "missing" {
                return Ok(LookupResponse::NotFound);
            }
            Ok(LookupResponse::Found(ProductRecord {
                name: Some("Tahini".into()),
                ingredients_text: Some("sesame paste".into()),
                allergen_tags: vec!["en:sesame-seeds".into()],
                trace_tags: Vec::new(),
            }))
        }
    }

    async fn app(dir: &tempfile::TempDir) -> ScannerApp {
        let db = Database::open_in_memory().unwrap();
        let settings = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let controller = ScanController::new(
            Arc::new(CannedLookup),
            Arc::new(ProfileRegistry::load(Arc::new(settings)).unwrap()),
            HistoryLedger::open(Arc::new(db)).await.unwrap(),
            Duration::from_secs(5),
        );
        ScannerApp { controller }
    }

    #[test]
    fn parses_barcodes_and_commands() {
        assert_eq!(ConsoleCommand::parse("   "), None);
        assert_eq!(
            ConsoleCommand::parse(" 3017620422003 "),
            Some(Ok(ConsoleCommand::Scan("3017620422003".into())))
        );
        assert_eq!(
            ConsoleCommand::parse(":toggle wheat"),
            Some(Ok(ConsoleCommand::Toggle(CanonicalAllergen::Gluten)))
        );
        assert_eq!(
            ConsoleCommand::parse(":clear-history"),
            Some(Ok(ConsoleCommand::ClearHistory))
        );
        assert_eq!(ConsoleCommand::parse(":quit"), Some(Ok(ConsoleCommand::Quit)));
        assert!(matches!(ConsoleCommand::parse(":toggle"), Some(Err(_))));
        assert!(matches!(ConsoleCommand::parse(":toggle pollen"), Some(Err(_))));
        assert!(matches!(ConsoleCommand::parse(":dance"), Some(Err(_))));
    }

    #[tokio::test]
    async fn toggle_then_profile_lists_selection() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let reply = dispatch(&app, ConsoleCommand::Toggle(CanonicalAllergen::Sesame))
            .await
            .unwrap();
        assert_eq!(reply, "Sesame added");

        let profile = get_profile(&app);
        assert!(profile.contains("[x] Sesame"));
        assert!(profile.contains("[ ] Milk"));

        let reply = toggle_allergen(&app, CanonicalAllergen::Sesame).unwrap();
        assert_eq!(reply, "Sesame removed");
    }

    #[tokio::test]
    async fn scan_renders_result_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        toggle_allergen(&app, CanonicalAllergen::Sesame).unwrap();

        let state = app.controller.scan("111").await.unwrap();
        let rendered = render_state(&state);
        assert!(rendered.starts_with("UNSAFE Tahini: contains Sesame"));
        assert!(rendered.contains("detected: Sesame"));

        assert!(scan_barcode(&app, "222").await.is_err());

        let history = get_history(&app).await.unwrap();
        assert!(history.contains("UNSAFE Tahini (111) [Sesame]"));

        clear_scan(&app).await.unwrap();
        assert_eq!(render_state(&app.controller.snapshot().await), "Ready to scan");

        assert_eq!(
            clear_history(&app).await.unwrap(),
            "Removed 1 history entries"
        );
        assert_eq!(get_history(&app).await.unwrap(), "No scans yet");
    }

    #[tokio::test]
    async fn not_found_renders_error_message() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let state = app.controller.scan("missing").await.unwrap();
        assert_eq!(render_state(&state), "Product not found (Barcode: missing)");
        assert_eq!(
            render_event(&ScanEvent::StateChanged(state)).as_deref(),
            Some("Product not found (Barcode: missing)")
        );
    }
}
