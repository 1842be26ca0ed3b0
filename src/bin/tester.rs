use std::collections::HashSet;
use std::io::{self, stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
	event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
	execute,
	terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use serde_json::Value;
use tokio::sync::mpsc;

use uno_harness::config::{self, HarnessConfig, LayoutMode};
use uno_harness::defaults;
use uno_harness::error::Result as HarnessResult;
use uno_harness::event_log::LogLevel;
use uno_harness::harness::MatchController;
use uno_harness::logging;
use uno_harness::mode::{GameMode, MatchType};
use uno_harness::session::{AppContext, Credentials, generate_device_id};
use uno_harness::social::{Poller, received_requests};
use uno_harness::theme::Theme;
use uno_harness::tui::{BoardState, GameUI, GameUIAction, UiCommand};

#[derive(Parser)]
#[command(name = "uno-tester")]
#[command(about = "Terminal test harness for the UNO game server")]
struct Cli {
	/// Device id for device login; a random one is generated when omitted.
	#[arg(short, long, env = "UNO_DEVICE_ID")]
	device_id: Option<String>,

	#[arg(short, long, env = "UNO_EMAIL", requires = "password")]
	email: Option<String>,

	#[arg(short, long, env = "UNO_PASSWORD")]
	password: Option<String>,

	/// Create a match on startup with this mode (2p, 3p, 4p, 2v2).
	#[arg(short, long)]
	mode: Option<GameMode>,

	#[arg(long, default_value = "private")]
	match_type: MatchType,

	/// Join an existing match on startup.
	#[arg(short, long, conflicts_with = "mode")]
	join: Option<String>,

	#[arg(long)]
	compact: bool,

	#[arg(short, long)]
	config: Option<PathBuf>,
}

impl Cli {
	fn credentials(&self) -> Credentials {
		match (&self.email, &self.password) {
			(Some(email), Some(password)) => Credentials::Email {
				email: email.clone(),
				password: password.clone(),
			},
			_ => Credentials::Device(self.device_id.clone().unwrap_or_else(generate_device_id)),
		}
	}
}

struct App {
	ctx: AppContext,
	controller: MatchController,
	ui: GameUI,
	poller: PollState,
	seen_requests: HashSet<String>,
}

impl App {
	fn new(ctx: AppContext, controller: MatchController, ui: GameUI) -> Self {
		Self {
			ctx,
			controller,
			ui,
			poller: None,
			seen_requests: HashSet::new(),
		}
	}

	fn start_polling(&mut self) {
		let period = Duration::from_secs(self.ctx.config.harness.follow_poll_secs.max(1));
		self.poller = Some(Poller::follow_requests(self.ctx.clone(), period));
	}

	fn stop_polling(&mut self) {
		if let Some((poller, _)) = self.poller.take() {
			poller.cancel();
		}
	}

	/// Keeps the follow-request poller alive exactly while a match is joined.
	fn sync_polling(&mut self) {
		match poll_change(self.controller.match_id().is_some(), self.poller.is_some()) {
			Some(PollChange::Start) => self.start_polling(),
			Some(PollChange::Stop) => self.stop_polling(),
			None => {}
		}
	}

	fn on_poll(&mut self, result: HarnessResult<Value>) {
		match result {
			Ok(data) => {
				for request in received_requests(&data, self.ctx.user_id()) {
					let from = request
						.get("fromUsername")
						.or_else(|| request.get("fromUserId"))
						.and_then(Value::as_str)
						.unwrap_or("someone")
						.to_string();
					if self.seen_requests.insert(from.clone()) {
						self.controller.notify(format!("Follow request from {}", from), LogLevel::Info);
					}
				}
			}
			Err(e) => tracing::debug!(error = %e, "follow request poll failed"),
		}
	}

	async fn execute(&mut self, command: UiCommand) {
		logging::tui::action(&format!("{:?}", command));

		let result = match command {
			UiCommand::CreateMatch { mode, match_type } => {
				self.controller.create_match(mode, match_type).await.map(|id| {
					self.ui.set_status(format!("Match {} - press [b] to add bots, [s] to start", id));
				})
			}
			UiCommand::JoinMatch(match_id) => self.controller.join_match(&match_id).await,
			UiCommand::StartGame => self.controller.start_game().await,
			UiCommand::Select(card) => {
				self.controller.select_card(card);
				Ok(())
			}
			UiCommand::PlayCard { card, color } => self.controller.play_card(card, color).await,
			UiCommand::DrawCard => self.controller.draw_card().await,
			UiCommand::PlayShield => self.controller.play_shield().await,
			UiCommand::Autoplay => self.controller.autoplay_turn().await,
			UiCommand::SwapTarget(target) => self.controller.choose_swap_target(&target).await,
			UiCommand::AddBot => self.controller.add_bot().await.map(|_| ()),
			UiCommand::LeaveMatch => self.controller.leave_match().await,
			UiCommand::ToggleLayout => Ok(()),
		};

		if let Err(e) = result {
			self.ui.set_status(format!("Error: {}", e));
		}
		self.sync_polling();
	}
}

type PollState = Option<(Poller, mpsc::UnboundedReceiver<HarnessResult<Value>>)>;

#[derive(Debug, PartialEq)]
enum PollChange {
	Start,
	Stop,
}

fn poll_change(in_match: bool, polling: bool) -> Option<PollChange> {
	match (in_match, polling) {
		(true, false) => Some(PollChange::Start),
		(false, true) => Some(PollChange::Stop),
		_ => None,
	}
}

async fn next_poll(poller: &mut PollState) -> Option<HarnessResult<Value>> {
	match poller.as_mut() {
		Some((_, rx)) => rx.recv().await,
		None => std::future::pending().await,
	}
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<HarnessConfig> {
	let config = match path {
		Some(path) => {
			let mut config = config::load_config(path)?;
			config.apply_overrides(|key| std::env::var(key).ok());
			config
		}
		None => config::load_config_auto()?,
	};
	Ok(config)
}

/// Reads terminal key presses on a plain thread so the async loop never
/// blocks on the terminal.
fn spawn_key_reader() -> mpsc::UnboundedReceiver<KeyEvent> {
	let (tx, rx) = mpsc::unbounded_channel();
	std::thread::spawn(move || {
		while !tx.is_closed() {
			match event::poll(Duration::from_millis(100)) {
				Ok(true) => {
					if let Ok(Event::Key(key)) = event::read() {
						if key.kind == KeyEventKind::Press && tx.send(key).is_err() {
							break;
						}
					}
				}
				Ok(false) => {}
				Err(_) => break,
			}
		}
	});
	rx
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	defaults::ensure_config();
	let config = load_config(cli.config.as_ref())?;
	let _log_guard = logging::init(&config.logging.resolve_dir())?;

	let layout = if cli.compact { LayoutMode::Compact } else { config.ui.layout };

	println!("Signing in to {}...", config.server.http_url());
	let ctx = AppContext::sign_in(config, &cli.credentials())
		.await
		.context("sign in failed")?;
	println!("Signed in as {} ({})", ctx.username(), ctx.user_id());

	let mut controller = MatchController::connect(&ctx)
		.await
		.context("socket connection failed")?;

	if let Some(match_id) = &cli.join {
		controller.join_match(match_id).await?;
	} else if let Some(mode) = cli.mode {
		controller.create_match(mode, cli.match_type).await?;
	}

	let ui = GameUI::new(Theme::load(), layout, ctx.username());
	let mut app = App::new(ctx, controller, ui);
	app.sync_polling();

	enable_raw_mode()?;
	let mut stdout = stdout();
	execute!(stdout, EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_app(&mut terminal, &mut app, spawn_key_reader()).await;

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

	app.stop_polling();
	app.controller.disconnect().await;
	result
}

async fn run_app(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	app: &mut App,
	mut keys: mpsc::UnboundedReceiver<KeyEvent>,
) -> anyhow::Result<()> {
	let mut redraw = tokio::time::interval(Duration::from_millis(250));

	loop {
		app.controller.tick();
		app.ui.sync(app.controller.view());

		terminal.draw(|f| {
			let board = BoardState::from_controller(&app.controller);
			app.ui.render(f, f.area(), &board);
		})?;

		let connected = app.controller.is_connected();
		tokio::select! {
			alive = app.controller.process_next(), if connected => {
				// Disconnects and server-side removals both clear the match.
				app.sync_polling();
				if !alive {
					app.ui.set_status("Disconnected from server. Press q to quit.");
				}
			}
			Some(result) = next_poll(&mut app.poller) => app.on_poll(result),
			key = keys.recv() => {
				let Some(key) = key else { return Ok(()) };
				logging::tui::input(&format!("{:?}", key.code));

				if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
					return Ok(());
				}

				let board = BoardState::from_controller(&app.controller);
				match app.ui.handle_key(key.code, &board) {
					GameUIAction::Command(command) => app.execute(command).await,
					GameUIAction::Quit => return Ok(()),
					GameUIAction::None => {}
				}
			}
			_ = redraw.tick() => {}
		}
	}
}
