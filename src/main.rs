// ============================================================================
// AquaVote - Vote pour les paires de marché AQUA dans le terminal
// ============================================================================
// Programme TUI : listes de paires (populaires, plus votées, mes votes),
// recherche par assets, bulletin de vote et votes verrouillés
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle infinie qui gère événements et rendering
// 3. Async dans sync : worker thread avec son runtime tokio
// 4. Channels : l'UI envoie des AppCommand, le worker renvoie des AppResult
// ============================================================================

use std::io;
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

use aquavote::api::{AquaClient, HorizonClient, PairsApi};
use aquavote::app::{App, AppCommand, InputTarget};
use aquavote::assets::AssetStore;
use aquavote::chain::{ClaimableBalancesStream, ClaimableSource};
use aquavote::config::Settings;
use aquavote::models::ClaimableState;
use aquavote::page::{execute as execute_fetch, FetchOutcome, PageContext, PageController, Session};
use aquavote::storage::{FileStorage, Storage};
use aquavote::ui::{events::EventHandler, render};

/// Résultats renvoyés par le worker thread
#[derive(Debug)]
enum AppResult {
    /// Une requête de liste est terminée (succès ou erreur)
    Fetched(FetchOutcome),

    /// Nouvel état des claimable balances du compte connecté
    Claimables(ClaimableState),
}

// ============================================================================
// Initialisation du logging
// ============================================================================
// CONCEPT : Logging dans une app TUI
// - Les println! ne fonctionnent pas une fois le TUI lancé
// - On log vers un fichier à la place, rotation quotidienne
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// # Utilisation
/// ```bash
/// tail -f ~/.local/share/aquavote/logs/aquavote.log
/// RUST_LOG=aquavote=trace cargo run
/// ```
fn init_logging(log_dir: &Path) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    std::fs::create_dir_all(log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "aquavote.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true)
                .with_thread_ids(true) // Utile pour distinguer UI et worker
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour aquavote, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aquavote=debug,info".into()),
        )
        .init();

    info!(log_dir = %log_dir.display(), "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    let settings = Settings::load(&Settings::default_path())?;

    // Si init échoue, on continue sans logs
    init_logging(&settings.log_dir()).unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!(?settings, "AquaVote starting up");

    // URL initiale de la page ("sort=topVoted", "base=native&counter=...")
    let initial_query = std::env::args().nth(1).unwrap_or_default();

    // Stockage local : bulletin de vote et cache d'assets
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(settings.storage_path())?);
    let assets = Arc::new(AssetStore::load(storage.clone()));
    if let Err(e) = assets.refresh_if_stale(Utc::now()) {
        warn!(error = ?e, "Failed to refresh assets cache");
    }

    let pairs_api: Arc<dyn PairsApi> = Arc::new(AquaClient::new(&settings.market_keys_url, &settings.voting_url)?);
    let claimables: Arc<dyn ClaimableSource> = Arc::new(HorizonClient::new(&settings.horizon_url)?);

    let session = match &settings.account_id {
        Some(account_id) => Session::logged(account_id),
        None => Session::anonymous(),
    };
    let mut ctx = PageContext::new(session, assets, storage);
    ctx.page_size = settings.page_size;
    ctx.update_interval = settings.update_interval();

    let page = PageController::new(ctx, std::time::Instant::now());
    let mut app = App::new(page, &settings.vote_asset);

    // Channels UI <-> worker
    let (command_tx, command_rx) = mpsc::channel::<AppCommand>();
    let (result_tx, result_rx) = mpsc::channel::<AppResult>();

    let runtime = Runtime::new().context("Échec de la création du runtime tokio")?;
    info!("Spawning background worker thread");
    let worker = Worker {
        runtime,
        pairs_api,
        claimables,
        poll_interval: settings.claimable_poll_interval(),
        result_tx,
    };
    std::thread::spawn(move || worker.run(command_rx));

    send_commands(&command_tx, app.mount(&initial_query));

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    // CONCEPT RUST : Arc<Mutex<>> pour partager l'état avec la closure de rendu
    let app = Arc::new(Mutex::new(app));
    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, app, &events, command_tx, result_rx);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Worker thread
// ============================================================================
// CONCEPT : Runtime dans un thread dédié
// - Chaque requête est spawnée : plusieurs requêtes peuvent être en vol
// - Le contrôleur ignore les réponses périmées (request id)
// - Le polling des claimable balances tourne sur le même runtime
// ============================================================================

struct Worker {
    runtime: Runtime,
    pairs_api: Arc<dyn PairsApi>,
    claimables: Arc<dyn ClaimableSource>,
    poll_interval: std::time::Duration,
    result_tx: mpsc::Sender<AppResult>,
}

impl Worker {
    fn run(self, command_rx: mpsc::Receiver<AppCommand>) {
        // Un seul flux à la fois : le remplacer arrête l'ancien (Drop)
        let mut stream: Option<ClaimableBalancesStream> = None;

        while let Ok(command) = command_rx.recv() {
            debug!(?command, "Worker received command");

            match command {
                AppCommand::Fetch(ticket) => {
                    let api = self.pairs_api.clone();
                    let result_tx = self.result_tx.clone();
                    self.runtime.spawn(async move {
                        let outcome = execute_fetch(api.as_ref(), ticket).await;
                        let _ = result_tx.send(AppResult::Fetched(outcome));
                    });
                }

                AppCommand::WatchClaimables { account_id } => {
                    let started = ClaimableBalancesStream::start(
                        self.runtime.handle(),
                        self.claimables.clone(),
                        &account_id,
                        self.poll_interval,
                    );

                    // Relais watch -> mpsc, se termine quand le flux est arrêté
                    let mut receiver = started.subscribe();
                    let result_tx = self.result_tx.clone();
                    self.runtime.spawn(async move {
                        while receiver.changed().await.is_ok() {
                            let state = receiver.borrow_and_update().clone();
                            if result_tx.send(AppResult::Claimables(state)).is_err() {
                                break;
                            }
                        }
                    });

                    stream = Some(started);
                }

                AppCommand::StopClaimables => {
                    if let Some(stream) = stream.take() {
                        stream.stop();
                    }
                }
            }
        }

        info!("Worker thread exiting (channel closed)");
    }
}

fn send_commands(command_tx: &mpsc::Sender<AppCommand>, commands: Vec<AppCommand>) {
    for command in commands {
        if command_tx.send(command).is_err() {
            error!("Worker thread disconnected!");
            return;
        }
    }
}

/// Verrouille l'état de l'application
///
/// Un mutex empoisonné (panic pendant le rendu) devient une erreur
fn lock(app: &Mutex<App>) -> Result<MutexGuard<'_, App>> {
    app.lock().map_err(|_| anyhow!("État de l'application corrompu (mutex empoisonné)"))
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. Résultats du worker
//   1. Render
//   2. Input
//   3. Update (timer de rafraîchissement)
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: Arc<Mutex<App>>,
    events: &EventHandler,
    command_tx: mpsc::Sender<AppCommand>,
    result_rx: mpsc::Receiver<AppResult>,
) -> Result<()> {
    loop {
        if !lock(&app)?.is_running() {
            break;
        }

        // 0. RÉSULTATS : on vide la file sans bloquer
        loop {
            match result_rx.try_recv() {
                Ok(AppResult::Fetched(outcome)) => {
                    lock(&app)?.on_fetch_outcome(outcome);
                }
                Ok(AppResult::Claimables(state)) => {
                    let commands = lock(&app)?.on_claimables(state);
                    send_commands(&command_tx, commands);
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    error!("Worker thread disconnected!");
                    break;
                }
            }
        }

        // 1. RENDER
        {
            let app_lock = lock(&app)?;
            terminal.draw(|frame| render(frame, &app_lock))?;
        }

        // 2. INPUT
        match events.next() {
            Ok(event) => {
                let commands = handle_event(&mut *lock(&app)?, event);
                send_commands(&command_tx, commands);
            }
            Err(e) => {
                warn!(error = ?e, "Failed to read terminal event");
            }
        }

        // 3. UPDATE
        let commands = lock(&app)?.tick();
        send_commands(&command_tx, commands);
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Traite un événement et retourne les commandes pour le worker
///
/// CONCEPT RUST : Pattern matching avec guards
/// - Le mode input est traité en premier : 'q' ou 'c' sont des caractères
/// - Puis la navigation contextuelle selon l'écran actuel
fn handle_event(app: &mut App, event: aquavote::ui::events::Event) -> Vec<AppCommand> {
    use aquavote::ui::events::{
        get_char_from_event, is_account_event, is_asset_char_event, is_backspace_event, is_base_event,
        is_clear_search_event, is_counter_event, is_create_pair_event, is_delete_event, is_down_event,
        is_enter_event, is_escape_event, is_next_page_event, is_next_sort_event, is_previous_page_event,
        is_previous_sort_event, is_quit_event, is_space_event, is_up_event, is_vote_event, Event,
    };

    if let Event::Tick = event {
        return Vec::new();
    }

    // ========================================
    // Input Mode : Gestion de la saisie
    // ========================================
    if app.is_in_input_mode() {
        if is_escape_event(&event) {
            info!("User cancelled input");
            app.cancel_input();
        } else if is_enter_event(&event) {
            return app.submit_input();
        } else if is_backspace_event(&event) {
            app.backspace();
        } else if is_asset_char_event(&event) {
            if let Some(c) = get_char_from_event(&event) {
                app.append_char(c);
            }
        }
        return Vec::new();
    }

    // Touche 'q' : quit confirmation two-step
    if is_quit_event(&event) {
        if app.is_awaiting_quit_confirmation() {
            info!("User confirmed quit");
            app.quit();
        } else {
            info!("User requested quit (awaiting confirmation)");
            app.request_quit();
        }
        return Vec::new();
    }

    // Toute autre touche annule la confirmation
    app.cancel_quit();

    if app.is_on_ballot() {
        if is_up_event(&event) {
            app.navigate_up();
        } else if is_down_event(&event) {
            app.navigate_down();
        } else if is_delete_event(&event) {
            app.remove_from_ballot();
        } else if is_escape_event(&event) {
            debug!("User closed ballot");
            app.close_ballot();
        }
        return Vec::new();
    }

    if app.is_on_claim_back() {
        if is_escape_event(&event) || is_space_event(&event) {
            debug!("User returned to dashboard");
            app.show_dashboard();
        }
        return Vec::new();
    }

    // ========================================
    // Dashboard
    // ========================================
    match event {
        Event::Key(_) if is_up_event(&event) => {
            app.navigate_up();
            Vec::new()
        }
        Event::Key(_) if is_down_event(&event) => {
            app.navigate_down();
            Vec::new()
        }
        Event::Key(_) if is_next_sort_event(&event) => app.next_sort(),
        Event::Key(_) if is_previous_sort_event(&event) => app.previous_sort(),
        Event::Key(_) if is_next_page_event(&event) => app.next_page(),
        Event::Key(_) if is_previous_page_event(&event) => app.previous_page(),
        Event::Key(_) if is_base_event(&event) => {
            app.start_input(InputTarget::Base);
            Vec::new()
        }
        Event::Key(_) if is_counter_event(&event) => {
            app.start_input(InputTarget::Counter);
            Vec::new()
        }
        Event::Key(_) if is_clear_search_event(&event) => app.clear_search(),
        Event::Key(_) if is_space_event(&event) => {
            app.toggle_selected();
            Vec::new()
        }
        Event::Key(_) if is_vote_event(&event) => app.start_vote(),
        Event::Key(_) if is_create_pair_event(&event) => app.create_pair(),
        Event::Key(_) if is_enter_event(&event) => app.show_claim_back(),
        Event::Key(_) if is_account_event(&event) => {
            if app.is_logged() {
                app.logout()
            } else {
                app.start_input(InputTarget::Account);
                Vec::new()
            }
        }
        Event::Key(_) if is_backspace_event(&event) => app.go_back(),
        Event::Key(_) if is_escape_event(&event) => {
            app.clear_status();
            Vec::new()
        }
        _ => Vec::new(),
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================
// IMPORTANT : Toujours restaurer le terminal avant de quitter !
// ============================================================================

/// Configure le terminal en mode TUI
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    // Alternate screen : l'écran précédent est restauré en quittant
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
