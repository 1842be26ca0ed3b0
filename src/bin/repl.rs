use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use uno_harness::card::{CardColor, CardId};
use uno_harness::config::{self, HarnessConfig};
use uno_harness::defaults;
use uno_harness::error::{HarnessError, Result as HarnessResult};
use uno_harness::harness::MatchController;
use uno_harness::logging;
use uno_harness::mode::{GameMode, MatchType};
use uno_harness::net::rpc::RpcClient;
use uno_harness::session::{AppContext, AuthOutcome, Credentials, auth, generate_device_id};
use uno_harness::social::{self, DEFAULT_MESSAGE_PAGE, DEFAULT_PAGE, Poller, chat, list_field, received_requests};

#[derive(Parser)]
#[command(name = "uno-repl")]
#[command(about = "Line-oriented client for the UNO game server")]
struct Cli {
	#[arg(short, long, env = "UNO_DEVICE_ID")]
	device_id: Option<String>,

	#[arg(short, long, env = "UNO_EMAIL", requires = "password")]
	email: Option<String>,

	#[arg(short, long, env = "UNO_PASSWORD")]
	password: Option<String>,

	#[arg(short, long)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	account: Option<AccountCommand>,
}

/// One-shot account calls that run before any session exists.
#[derive(Subcommand)]
enum AccountCommand {
	CheckUsername { username: String },
	Register { username: String, email: String, password: String },
	VerifyRegistration { email: String, otp: String },
	SkipVerification { email: String },
	ResendOtp { email: String },
	SendOtp { email: String, password: String },
	VerifyOtp { email: String, otp: String },
	Google { id_token: String },
}

const HELP: &str = "\
match:   create <2p|3p|4p|2v2> [private|random] | join <id> | leave | bot
game:    start | play <cardId> [color] | draw | swap <userId> | shield | auto
view:    state | hand | log [n]
account: profile | update-profile <name> [bio] [country] | link-email <email> <pw>
         verify-link <otp> | refresh | online <userId...> | friends
social:  post <text> | feed | like <postId> | unlike <postId> | comment <postId> <text>
         comments <postId> | follow <userId> | accept <userId> | requests | search <query>
chat:    channels | new-channel <type> <name> <userId...> | say <channelId> <text>
         messages <channelId>
poll:    poll start | poll stop
other:   help | quit";

fn print_value(value: &Value) {
	match serde_json::to_string_pretty(value) {
		Ok(text) => println!("{}", text),
		Err(_) => println!("{}", value),
	}
}

fn print_outcome(outcome: &AuthOutcome) {
	println!(
		"session for {} ({}) expires at {}",
		outcome.session.username, outcome.session.user_id, outcome.session.expires_at_ms
	);
}

async fn run_account(rpc: &RpcClient, command: AccountCommand) -> HarnessResult<()> {
	match command {
		AccountCommand::CheckUsername { username } => print_value(&auth::check_username_available(rpc, &username).await?),
		AccountCommand::Register { username, email, password } => {
			print_value(&auth::register_email(rpc, &username, &email, &password).await?)
		}
		AccountCommand::VerifyRegistration { email, otp } => {
			print_outcome(&auth::verify_registration_otp(rpc, &email, &otp).await?)
		}
		AccountCommand::SkipVerification { email } => print_outcome(&auth::skip_verification(rpc, &email).await?),
		AccountCommand::ResendOtp { email } => print_value(&auth::resend_otp(rpc, &email).await?),
		AccountCommand::SendOtp { email, password } => print_value(&auth::send_otp(rpc, &email, &password).await?),
		AccountCommand::VerifyOtp { email, otp } => print_outcome(&auth::verify_otp(rpc, &email, &otp).await?),
		AccountCommand::Google { id_token } => print_outcome(&auth::google_login(rpc, &id_token).await?),
	}
	Ok(())
}

struct Repl {
	ctx: AppContext,
	controller: MatchController,
	poller: Option<(Poller, mpsc::UnboundedReceiver<HarnessResult<Value>>)>,
}

fn arg<'a>(args: &[&'a str], index: usize, name: &str) -> HarnessResult<&'a str> {
	args.get(index)
		.copied()
		.ok_or_else(|| HarnessError::InvalidArgument(format!("missing <{}>", name)))
}

fn rest(args: &[&str], from: usize) -> String {
	args.iter().skip(from).copied().collect::<Vec<_>>().join(" ")
}

impl Repl {
	fn stop_polling(&mut self) {
		if let Some((poller, _)) = self.poller.take() {
			poller.cancel();
			println!("follow-request polling stopped");
		}
	}

	fn print_state(&self) {
		let view = self.controller.view();
		let Some(match_id) = view.match_id.as_deref() else {
			println!("not in a match");
			return;
		};
		println!("match {} started={} ended={}", match_id, view.is_game_started, view.game_ended);
		for player in &view.players {
			let marker = if view.current_player().map(|p| &p.user_id) == Some(&player.user_id) { ">" } else { " " };
			println!("{} {:<16} cards={}{}", marker, player.display_name(), player.hand_size, if player.has_uno() { " UNO!" } else { "" });
		}
		if let Some(card) = view.top_discard_card {
			println!("discard: {}", card.name());
		}
		if let Some(color) = view.current_color {
			println!("color: {}", color.name());
		}
		if view.draw_stack > 0 {
			println!("draw stack: +{}", view.draw_stack);
		}
		println!("timer: {}", self.controller.time_display().display);
		if view.game_ended {
			println!("winner: {}", view.winner.as_deref().unwrap_or("-"));
			for (name, score) in view.score_lines() {
				println!("  {:<16} {}", name, score);
			}
		}
	}

	fn print_hand(&self) {
		let view = self.controller.view();
		let me = self.controller.my_user_id();
		for card in &view.my_hand {
			let mark = if view.is_playable(*card, me) { "*" } else { " " };
			println!("{} {:>3}  {}", mark, card.0, card.name());
		}
	}

	/// Runs one command line. Returns `false` when the user asked to quit.
	async fn dispatch(&mut self, line: &str) -> HarnessResult<bool> {
		let args: Vec<&str> = line.split_whitespace().collect();
		let Some((&command, _)) = args.split_first() else {
			return Ok(true);
		};
		logging::tui::action(line);

		match command {
			"help" | "?" => println!("{}", HELP),
			"quit" | "exit" => return Ok(false),

			"create" => {
				let mode: GameMode = arg(&args, 1, "mode")?.parse()?;
				let match_type: MatchType = args.get(2).copied().unwrap_or("private").parse()?;
				let id = self.controller.create_match(mode, match_type).await?;
				println!("joined match {}", id);
			}
			"join" => self.controller.join_match(arg(&args, 1, "match id")?).await?,
			"leave" => {
				self.stop_polling();
				self.controller.leave_match().await?;
			}
			"bot" => print_value(&self.controller.add_bot().await?),

			"start" => self.controller.start_game().await?,
			"play" => {
				let id: u32 = arg(&args, 1, "cardId")?
					.parse()
					.map_err(|_| HarnessError::InvalidArgument("card id must be a number".to_string()))?;
				let color = match args.get(2) {
					Some(text) => Some(
						CardColor::parse(text)
							.ok_or_else(|| HarnessError::InvalidArgument(format!("unknown color '{}'", text)))?,
					),
					None => None,
				};
				self.controller.play_card(CardId(id), color).await?;
			}
			"draw" => self.controller.draw_card().await?,
			"swap" => self.controller.choose_swap_target(arg(&args, 1, "userId")?).await?,
			"shield" => self.controller.play_shield().await?,
			"auto" => self.controller.autoplay_turn().await?,

			"state" => self.print_state(),
			"hand" => self.print_hand(),
			"log" => {
				let count = args.get(1).and_then(|n| n.parse().ok()).unwrap_or(20);
				for entry in self.controller.log().recent(count) {
					println!("{} [{}] {}", entry.timestamp(), entry.level.tag(), entry.message);
				}
			}

			"profile" => print_value(&self.ctx.get_profile().await?),
			"update-profile" => {
				let name = arg(&args, 1, "display name")?;
				let bio = args.get(2).copied().unwrap_or("");
				let country = args.get(3).copied().unwrap_or("");
				print_value(&self.ctx.update_profile(name, bio, country).await?);
			}
			"link-email" => print_value(&self.ctx.link_email(arg(&args, 1, "email")?, arg(&args, 2, "password")?).await?),
			"verify-link" => print_value(&self.ctx.verify_email_link(arg(&args, 1, "otp")?).await?),
			"refresh" => print_value(&self.ctx.refresh_session().await?),
			"online" => {
				let ids: Vec<String> = args.iter().skip(1).map(|s| s.to_string()).collect();
				print_value(&self.ctx.online_status(&ids).await?);
			}
			"friends" => print_value(&self.ctx.online_friends().await?),

			"post" => print_value(&social::create_post(&self.ctx, &rest(&args, 1), "").await?),
			"feed" => {
				let feed = social::get_feed(&self.ctx, DEFAULT_PAGE, "").await?;
				for post in list_field(&feed, "posts") {
					print_value(post);
				}
			}
			"like" => print_value(&social::like_post(&self.ctx, arg(&args, 1, "postId")?).await?),
			"unlike" => print_value(&social::unlike_post(&self.ctx, arg(&args, 1, "postId")?).await?),
			"comment" => {
				let post_id = arg(&args, 1, "postId")?;
				print_value(&social::add_comment(&self.ctx, post_id, &rest(&args, 2)).await?);
			}
			"comments" => print_value(&social::get_comments(&self.ctx, arg(&args, 1, "postId")?, DEFAULT_PAGE).await?),
			"follow" => print_value(&social::send_follow_request(&self.ctx, arg(&args, 1, "userId")?).await?),
			"accept" => print_value(&social::accept_follow_request(&self.ctx, arg(&args, 1, "userId")?).await?),
			"requests" => {
				let result = social::get_follow_requests(&self.ctx).await?;
				for request in received_requests(&result, self.ctx.user_id()) {
					print_value(&request);
				}
			}
			"search" => print_value(&social::search_users(&self.ctx, &rest(&args, 1), DEFAULT_PAGE).await?),

			"channels" => print_value(&chat::get_channels(&self.ctx).await?),
			"new-channel" => {
				let channel_type = arg(&args, 1, "type")?;
				let name = arg(&args, 2, "name")?;
				let ids: Vec<String> = args.iter().skip(3).map(|s| s.to_string()).collect();
				print_value(&chat::create_channel(&self.ctx, channel_type, name, &ids).await?);
			}
			"say" => {
				let channel_id = arg(&args, 1, "channelId")?;
				print_value(&chat::send_message(&self.ctx, channel_id, &rest(&args, 2), "text", "").await?);
			}
			"messages" => {
				let channel_id = arg(&args, 1, "channelId")?;
				print_value(&chat::get_messages(&self.ctx, channel_id, DEFAULT_MESSAGE_PAGE, "").await?);
			}

			"poll" => match args.get(1).copied() {
				Some("start") => {
					self.stop_polling();
					let period = Duration::from_secs(self.ctx.config.harness.follow_poll_secs.max(1));
					self.poller = Some(Poller::follow_requests(self.ctx.clone(), period));
					println!("polling follow requests every {}s", period.as_secs());
				}
				Some("stop") => self.stop_polling(),
				_ => println!("usage: poll start|stop"),
			},

			other => println!("unknown command '{}', try 'help'", other),
		}
		Ok(true)
	}

	fn flush_notifications(&mut self) {
		for note in self.controller.take_notifications() {
			println!("[{}] {}", note.level.tag(), note.message);
		}
	}
}

async fn next_poll(poller: &mut Option<(Poller, mpsc::UnboundedReceiver<HarnessResult<Value>>)>) -> Option<HarnessResult<Value>> {
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	defaults::ensure_config();
	let config = load_config(cli.config.as_ref())?;
	let _log_guard = logging::init(&config.logging.resolve_dir())?;

	if let Some(command) = cli.account {
		let rpc = RpcClient::new(&config.server);
		run_account(&rpc, command).await?;
		return Ok(());
	}

	let credentials = match (cli.email, cli.password) {
		(Some(email), Some(password)) => Credentials::Email { email, password },
		_ => Credentials::Device(cli.device_id.unwrap_or_else(generate_device_id)),
	};
	let ctx = AppContext::sign_in(config, &credentials).await.context("sign in failed")?;
	println!("signed in as {} ({})", ctx.username(), ctx.user_id());

	let controller = MatchController::connect(&ctx).await.context("socket connection failed")?;
	let mut repl = Repl { ctx, controller, poller: None };
	println!("type 'help' for commands");

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		let connected = repl.controller.is_connected();

		tokio::select! {
			line = lines.next_line() => {
				let Some(line) = line? else { break };
				match repl.dispatch(line.trim()).await {
					Ok(true) => {}
					Ok(false) => break,
					Err(e) => println!("error: {}", e),
				}
			}
			alive = repl.controller.process_next(), if connected => {
				if !alive {
					repl.stop_polling();
				}
			}
			Some(result) = next_poll(&mut repl.poller) => match result {
				Ok(data) => {
					for request in received_requests(&data, repl.ctx.user_id()) {
						print!("follow request: ");
						print_value(&request);
					}
				}
				Err(e) => println!("poll failed: {}", e),
			},
		}

		repl.flush_notifications();
	}

	repl.stop_polling();
	repl.controller.disconnect().await;
	Ok(())
}
